//! Order and price-query notifications.
//!
//! Outbound email is modelled as a [`Notifier`] capability that always
//! answers with a [`Delivery`] instead of raising. Callers decide whether a
//! failed delivery matters (see `notify.required` in the config).
//!
//! # Providers
//!
//! | Config Value | Notifier | Behaviour |
//! |--------------|----------|-----------|
//! | `"disabled"` | [`DisabledNotifier`] | every send fails with "notifications disabled" |
//! | `"log"` | [`LogNotifier`] | writes the message to the log and reports success |
//! | `"http"` | [`HttpNotifier`] | POSTs JSON to a mail relay endpoint |
//!
//! There is no retry: a failed send is reported once and left to the caller.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use cartridge_shop_core::models::{OrderRecord, QueryRecord};

use crate::config::NotifyConfig;

/// A formatted email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outcome of a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed { reason: String },
}

impl Delivery {
    pub fn failed(reason: impl Into<String>) -> Self {
        Delivery::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Provider name as written in the config.
    fn name(&self) -> &str;

    async fn send(&self, message: &Message) -> Delivery;
}

pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send(&self, _message: &Message) -> Delivery {
        Delivery::failed("notifications disabled")
    }
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &Message) -> Delivery {
        tracing::info!(to = %message.to, subject = %message.subject, "notification\n{}", message.text);
        Delivery::Delivered
    }
}

/// Sends mail through an HTTP relay.
///
/// Request body: `{"from": ..., "to": ..., "subject": ..., "text": ...}` with
/// `Authorization: Bearer <key>`. Any 2xx response counts as delivered.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpNotifier {
    pub fn new(endpoint: &str, api_key: &str, from: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &Message) -> Delivery {
        let body = serde_json::json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) if response.status().is_success() => Delivery::Delivered,
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                Delivery::failed(format!("mail relay returned {}: {}", status, text.trim()))
            }
            Err(e) => Delivery::failed(format!("mail relay unreachable: {}", e)),
        }
    }
}

/// Builds the notifier named by `notify.provider`.
///
/// The `http` provider's API key is read here, once, from the environment
/// variable named by `notify.api_key_env`.
pub fn create_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledNotifier)),
        "log" => Ok(Arc::new(LogNotifier)),
        "http" => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| anyhow!("notify.endpoint required for http provider"))?;
            let key_var = config
                .api_key_env
                .as_deref()
                .ok_or_else(|| anyhow!("notify.api_key_env required for http provider"))?;
            let api_key = std::env::var(key_var)
                .map_err(|_| anyhow!("{} environment variable not set", key_var))?;
            let from = config.from.as_deref().unwrap_or_default();
            Ok(Arc::new(HttpNotifier::new(
                endpoint,
                &api_key,
                from,
                config.timeout_secs,
            )?))
        }
        other => bail!("Unknown notify provider: {}", other),
    }
}

/// Notifier plus the addressing policy the order handlers need.
#[derive(Clone)]
pub struct Mailer {
    notifier: Arc<dyn Notifier>,
    admin_email: Option<String>,
    required: bool,
}

impl Mailer {
    pub fn new(notifier: Arc<dyn Notifier>, admin_email: Option<String>, required: bool) -> Self {
        Self {
            notifier,
            admin_email,
            required,
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        Ok(Self::new(
            create_notifier(config)?,
            config.admin_email.clone(),
            config.required,
        ))
    }

    /// Whether a failed admin notification must fail the request.
    pub fn required(&self) -> bool {
        self.required
    }

    pub fn provider(&self) -> &str {
        self.notifier.name()
    }

    pub async fn notify_admin(&self, subject: String, text: String) -> Delivery {
        match &self.admin_email {
            Some(to) => self.deliver(to.clone(), subject, text).await,
            None => Delivery::failed("no admin address configured"),
        }
    }

    pub async fn notify_customer(&self, to: &str, subject: String, text: String) -> Delivery {
        self.deliver(to.trim().to_string(), subject, text).await
    }

    async fn deliver(&self, to: String, subject: String, text: String) -> Delivery {
        let message = Message { to, subject, text };
        let delivery = self.notifier.send(&message).await;
        if let Delivery::Failed { reason } = &delivery {
            tracing::warn!(
                provider = self.notifier.name(),
                to = %message.to,
                subject = %message.subject,
                "notification failed: {}",
                reason
            );
        }
        delivery
    }
}

// ============ Message builders ============

pub fn format_rand(amount: f64) -> String {
    format!("R{:.2}", amount)
}

fn product_label(name: &str, code: Option<&str>) -> String {
    match code {
        Some(c) => format!("{} ({})", name, c),
        None => name.to_string(),
    }
}

pub fn order_admin_message(order: &OrderRecord) -> (String, String) {
    let subject = format!("New order {}", order.id);
    let text = format!(
        "A new order was placed.\n\n\
         Order:    {}\n\
         Product:  {}\n\
         Quantity: {}\n\
         Price:    {} each\n\
         Total:    {}\n\n\
         Customer: {}\n\
         Email:    {}\n\
         Phone:    {}\n",
        order.id,
        product_label(&order.product_name, order.product_code.as_deref()),
        order.quantity,
        format_rand(order.unit_price),
        format_rand(order.total),
        order.customer_name,
        order.email,
        order.phone.as_deref().unwrap_or("-"),
    );
    (subject, text)
}

pub fn order_customer_message(order: &OrderRecord) -> (String, String) {
    let subject = "Your cartridge order has been received".to_string();
    let text = format!(
        "Hi {},\n\n\
         Thank you for your order of {} x {}.\n\
         Total: {}\n\
         Reference: {}\n\n\
         We will contact you shortly to arrange payment and delivery.\n",
        order.customer_name,
        order.quantity,
        product_label(&order.product_name, order.product_code.as_deref()),
        format_rand(order.total),
        order.id,
    );
    (subject, text)
}

pub fn query_admin_message(query: &QueryRecord) -> (String, String) {
    let subject = format!("Price query for {}", query.product_name);
    let text = format!(
        "A customer asked for a price.\n\n\
         Query:    {}\n\
         Product:  {}\n\n\
         Customer: {}\n\
         Email:    {}\n\
         Phone:    {}\n\
         Message:  {}\n",
        query.id,
        product_label(&query.product_name, query.product_code.as_deref()),
        query.customer_name,
        query.email,
        query.phone.as_deref().unwrap_or("-"),
        query.message.as_deref().unwrap_or("-"),
    );
    (subject, text)
}

pub fn query_customer_message(query: &QueryRecord) -> (String, String) {
    let subject = "We received your price query".to_string();
    let text = format!(
        "Hi {},\n\n\
         Thanks for asking about {}. We will email you a quote soon.\n\
         Reference: {}\n",
        query.customer_name,
        product_label(&query.product_name, query.product_code.as_deref()),
        query.id,
    );
    (subject, text)
}
