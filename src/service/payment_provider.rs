// service/payment_provider.rs
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;

use crate::{config::Config, utils::fees::to_minor_units};

pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentInitResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChargeVerification {
    pub status: String,
    pub amount_minor: i64,
    pub gateway_reference: String,
    pub paid_at: String,
    pub channel: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferInitiation {
    pub reference: String,
    pub transfer_code: String,
    pub status: String,
}

/// Thin Paystack client. Every call here is an external boundary: charges
/// are keyed by our reference, transfers by a payment-derived reference, so
/// redeliveries and retries are deduplicated on the gateway side.
pub struct PaymentProviderService {
    secret_key: String,
    currency: String,
    client: reqwest::Client,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Self {
        Self {
            secret_key: config.paystack_secret_key.clone(),
            currency: config.currency.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn initialize_payment(
        &self,
        email: String,
        amount: &BigDecimal,
        reference: String,
        metadata: Option<serde_json::Value>,
    ) -> Result<PaymentInitResponse, ProviderError> {
        let amount_minor = to_minor_units(amount).ok_or("Amount out of range for gateway")?;

        let payload = serde_json::json!({
            "email": email,
            "amount": amount_minor,
            "reference": reference,
            "currency": self.currency,
            "metadata": metadata.unwrap_or(serde_json::json!({})),
            "channels": ["card", "bank", "ussd", "qr", "mobile_money", "bank_transfer"]
        });

        let response = self
            .client
            .post(format!("{}/transaction/initialize", PAYSTACK_BASE_URL))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;

        if body["status"].as_bool().unwrap_or(false) {
            let data = &body["data"];
            Ok(PaymentInitResponse {
                authorization_url: data["authorization_url"].as_str().unwrap_or("").to_string(),
                access_code: data["access_code"].as_str().unwrap_or("").to_string(),
                reference: data["reference"].as_str().unwrap_or("").to_string(),
            })
        } else {
            Err(body["message"]
                .as_str()
                .unwrap_or("Payment initialization failed")
                .into())
        }
    }

    pub async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification, ProviderError> {
        let url = format!("{}/transaction/verify/{}", PAYSTACK_BASE_URL, reference);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;

        if !body["status"].as_bool().unwrap_or(false) {
            return Err(body["message"].as_str().unwrap_or("Verification failed").into());
        }

        let data = &body["data"];
        if data["status"].as_str() != Some("success") {
            return Err("Charge not successful".into());
        }

        Ok(ChargeVerification {
            status: "success".to_string(),
            amount_minor: data["amount"].as_i64().unwrap_or(0),
            gateway_reference: data["reference"].as_str().unwrap_or("").to_string(),
            paid_at: data["paid_at"].as_str().unwrap_or("").to_string(),
            channel: data["channel"].as_str().unwrap_or("").to_string(),
        })
    }

    /// Reverse a captured charge.
    pub async fn refund_charge(&self, reference: &str) -> Result<(), ProviderError> {
        let payload = serde_json::json!({ "transaction": reference });

        let response = self
            .client
            .post(format!("{}/refund", PAYSTACK_BASE_URL))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;

        if body["status"].as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(body["message"].as_str().unwrap_or("Refund failed").into())
        }
    }

    pub async fn create_transfer_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, ProviderError> {
        let payload = serde_json::json!({
            "type": "nuban",
            "name": name,
            "account_number": account_number,
            "bank_code": bank_code,
            "currency": self.currency
        });

        let response = self
            .client
            .post(format!("{}/transferrecipient", PAYSTACK_BASE_URL))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;

        if !body["status"].as_bool().unwrap_or(false) {
            return Err(body["message"]
                .as_str()
                .unwrap_or("Failed to create transfer recipient")
                .into());
        }

        body["data"]["recipient_code"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| "Missing recipient code".into())
    }

    pub async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: &BigDecimal,
        reference: &str,
        reason: &str,
    ) -> Result<TransferInitiation, ProviderError> {
        let amount_minor = to_minor_units(amount).ok_or("Amount out of range for gateway")?;

        let payload = serde_json::json!({
            "source": "balance",
            "amount": amount_minor,
            "reference": reference,
            "recipient": recipient_code,
            "reason": reason
        });

        let response = self
            .client
            .post(format!("{}/transfer", PAYSTACK_BASE_URL))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;

        if body["status"].as_bool().unwrap_or(false) {
            let data = &body["data"];
            Ok(TransferInitiation {
                reference: data["reference"].as_str().unwrap_or("").to_string(),
                transfer_code: data["transfer_code"].as_str().unwrap_or("").to_string(),
                status: data["status"].as_str().unwrap_or("pending").to_string(),
            })
        } else {
            Err(body["message"].as_str().unwrap_or("Transfer failed").into())
        }
    }
}
