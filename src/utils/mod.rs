pub mod fees;
pub mod references;
