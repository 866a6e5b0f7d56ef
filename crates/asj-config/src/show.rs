//! Typed view over the merged show configuration.

use anyhow::{Context, Result};
use asj_money::RateBps;
use serde::Deserialize;
use serde_json::Value;

/// Everything the show's code reads from configuration.
///
/// Credentials (Square access token and signature key, Telegram bot token
/// and webhook secret, mail relay key) are deliberately absent: those come
/// from the environment, and the loader rejects secret-shaped literals.
#[derive(Debug, Clone)]
pub struct ShowConfig {
    pub name: String,
    pub year: String,
    pub email_sender: String,
    pub cheque_thank_you: String,
    pub tax_rate: RateBps,
    pub tax_description: String,
    pub commission: RateBps,
    pub invoice_prefix: String,
    pub max_piece_id: i32,
    /// Offset applied to the mod-11 bidder-ID checksum for this show.
    pub bidder_id_offset: u32,
    /// Glyph standing in for a check value of 10.
    pub bidder_id_check10: char,
    pub square: SquareConfig,
    pub telegram: TelegramConfig,
    /// HTTP mail relay endpoint, e.g. a Mailgun-compatible messages URL.
    pub mail_relay_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquareConfig {
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub location_id: String,
    /// `"sandbox"` or `"production"`.
    #[serde(default = "default_square_environment")]
    pub environment: String,
    /// Public URL Square signs webhook deliveries against.
    #[serde(default)]
    pub notification_url: String,
}

fn default_square_environment() -> String {
    "sandbox".to_string()
}

impl SquareConfig {
    pub fn api_base(&self) -> &'static str {
        if self.environment == "sandbox" {
            "https://connect.squareupsandbox.com"
        } else {
            "https://connect.squareup.com"
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Public URL registered with the Bot API for webhook deliveries.
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
struct RawShow {
    name: String,
    year: String,
    #[serde(default)]
    email_sender: String,
    #[serde(default)]
    cheque_thank_you: String,
}

#[derive(Debug, Deserialize)]
struct RawMoney {
    tax_rate: String,
    #[serde(default)]
    tax_description: String,
    commission: String,
    invoice_prefix: String,
}

#[derive(Debug, Deserialize)]
struct RawPieces {
    #[serde(default = "default_max_piece_id")]
    max_piece_id: i32,
}

fn default_max_piece_id() -> i32 {
    999
}

#[derive(Debug, Deserialize)]
struct RawBidderIds {
    #[serde(default)]
    mod11_offset: u32,
    #[serde(default = "default_check10")]
    check10: char,
}

fn default_check10() -> char {
    'X'
}

#[derive(Debug, Deserialize)]
struct RawMail {
    #[serde(default)]
    relay_url: String,
}

impl ShowConfig {
    /// Build the typed view from the merged config document.
    pub fn from_json(config: &Value) -> Result<ShowConfig> {
        let show: RawShow = section(config, "show")?;
        let money: RawMoney = section(config, "money")?;
        let pieces: RawPieces = section_or_default(
            config,
            "pieces",
            RawPieces {
                max_piece_id: default_max_piece_id(),
            },
        )?;
        let bidder_ids: RawBidderIds = section_or_default(
            config,
            "bidder_ids",
            RawBidderIds {
                mod11_offset: 0,
                check10: default_check10(),
            },
        )?;
        let square: SquareConfig = section_or_default(
            config,
            "square",
            SquareConfig {
                application_id: String::new(),
                location_id: String::new(),
                environment: default_square_environment(),
                notification_url: String::new(),
            },
        )?;
        let telegram: TelegramConfig = section_or_default(
            config,
            "telegram",
            TelegramConfig {
                enabled: false,
                webhook_url: String::new(),
            },
        )?;
        let mail: RawMail = section_or_default(
            config,
            "mail",
            RawMail {
                relay_url: String::new(),
            },
        )?;

        let tax_rate = RateBps::parse_fraction(&money.tax_rate)
            .with_context(|| format!("invalid money.tax_rate: {:?}", money.tax_rate))?;
        let commission = RateBps::parse_fraction(&money.commission)
            .with_context(|| format!("invalid money.commission: {:?}", money.commission))?;

        Ok(ShowConfig {
            name: show.name,
            year: show.year,
            email_sender: show.email_sender,
            cheque_thank_you: show.cheque_thank_you,
            tax_rate,
            tax_description: money.tax_description,
            commission,
            invoice_prefix: money.invoice_prefix,
            max_piece_id: pieces.max_piece_id,
            bidder_id_offset: bidder_ids.mod11_offset,
            bidder_id_check10: bidder_ids.check10,
            square,
            telegram,
            mail_relay_url: mail.relay_url,
        })
    }
}

fn section<T: serde::de::DeserializeOwned>(config: &Value, key: &str) -> Result<T> {
    let v = config
        .get(key)
        .with_context(|| format!("missing config section: {key}"))?;
    serde_json::from_value(v.clone()).with_context(|| format!("invalid config section: {key}"))
}

fn section_or_default<T: serde::de::DeserializeOwned>(
    config: &Value,
    key: &str,
    default: T,
) -> Result<T> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => serde_json::from_value(v.clone())
            .with_context(|| format!("invalid config section: {key}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    const FULL: &str = r#"
show:
  name: Generic Art Show
  year: "2026"
  email_sender: "Generic Art Show <artshow@example.com>"
  cheque_thank_you: Thank you for exhibiting
money:
  tax_rate: "0.0825"
  tax_description: County 8.25% Tax
  commission: "0.10"
  invoice_prefix: "2026-"
pieces:
  max_piece_id: 500
bidder_ids:
  mod11_offset: 4
  check10: "@"
square:
  application_id: app-id
  location_id: loc-id
  environment: production
  notification_url: https://example.com/square/webhook
telegram:
  enabled: true
  webhook_url: https://example.com/telegram/webhook
mail:
  relay_url: https://mail.example.com/v3/messages
"#;

    #[test]
    fn full_config_parses() {
        let loaded = load_layered_yaml_from_strings(&[FULL]).unwrap();
        let show = loaded.show().unwrap();
        assert_eq!(show.name, "Generic Art Show");
        assert_eq!(show.tax_rate.percent_string(), "8.25%");
        assert_eq!(show.commission.percent_string(), "10%");
        assert_eq!(show.invoice_prefix, "2026-");
        assert_eq!(show.max_piece_id, 500);
        assert_eq!(show.bidder_id_offset, 4);
        assert_eq!(show.bidder_id_check10, '@');
        assert_eq!(show.square.api_base(), "https://connect.squareup.com");
        assert!(show.telegram.enabled);
    }

    #[test]
    fn optional_sections_default() {
        let minimal = r#"
show:
  name: X
  year: "2026"
money:
  tax_rate: "0.10"
  commission: "0.10"
  invoice_prefix: "2026-"
"#;
        let loaded = load_layered_yaml_from_strings(&[minimal]).unwrap();
        let show = loaded.show().unwrap();
        assert_eq!(show.max_piece_id, 999);
        assert_eq!(show.bidder_id_offset, 0);
        assert_eq!(show.bidder_id_check10, 'X');
        assert_eq!(show.square.environment, "sandbox");
        assert_eq!(
            show.square.api_base(),
            "https://connect.squareupsandbox.com"
        );
        assert!(!show.telegram.enabled);
    }

    #[test]
    fn missing_required_section_fails() {
        let loaded = load_layered_yaml_from_strings(&["show:\n  name: X\n  year: \"2026\"\n"])
            .unwrap();
        assert!(loaded.show().is_err());
    }

    #[test]
    fn bad_rate_fails_with_context() {
        let doc = r#"
show:
  name: X
  year: "2026"
money:
  tax_rate: "ten percent"
  commission: "0.10"
  invoice_prefix: "2026-"
"#;
        let loaded = load_layered_yaml_from_strings(&[doc]).unwrap();
        let err = loaded.show().unwrap_err();
        assert!(err.to_string().contains("tax_rate"));
    }
}
