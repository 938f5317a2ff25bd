//! Alert rule and event models.
//!
//! Rules are owned by the external store and read-only here; the core
//! holds transient copies fetched once per evaluation pass. Events are
//! created here, exactly one per detected breach per pass, and only their
//! delivery state ever changes afterwards.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketwatch_market_data::Quote;

/// Which threshold a rule breached.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Price at or below the configured floor.
    PriceFloor,
    /// Price at or above the configured ceiling.
    PriceCeiling,
    /// Percent gain at or above the rise threshold.
    Rise,
    /// Percent loss at or beyond the fall threshold.
    Fall,
}

impl AlertKind {
    /// Stable identifier used in event records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceFloor => "price_min",
            Self::PriceCeiling => "price_max",
            Self::Rise => "rise",
            Self::Fall => "fall",
        }
    }
}

/// A breached predicate and the value that tripped it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Breach {
    pub kind: AlertKind,
    /// Price for floor/ceiling breaches, percent change for rise/fall.
    pub value: Decimal,
}

/// A user's threshold watch on one symbol.
///
/// Any subset of thresholds may be unset; an unset threshold never
/// triggers. Lifecycle (create/edit/delete) belongs to the excluded CRUD
/// layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub rise_threshold: Option<Decimal>,
    pub fall_threshold: Option<Decimal>,
    pub is_active: bool,
}

impl AlertRule {
    /// Evaluate the rule's predicates against a quote.
    ///
    /// Checks run in a fixed order (floor, ceiling, rise, fall) and the
    /// first breach wins, so a rule fires at most once per pass even when
    /// several thresholds are breached simultaneously. Percent change is
    /// recomputed from the previous close (zero when the previous close
    /// is zero), never taken from the vendor's own change field.
    pub fn evaluate(&self, quote: &Quote) -> Option<Breach> {
        let price = quote.price;

        if let Some(floor) = self.price_min {
            if price <= floor {
                return Some(Breach {
                    kind: AlertKind::PriceFloor,
                    value: price,
                });
            }
        }

        if let Some(ceiling) = self.price_max {
            if price >= ceiling {
                return Some(Breach {
                    kind: AlertKind::PriceCeiling,
                    value: price,
                });
            }
        }

        let percent = Quote::percent_change(price, quote.prev_close);

        if let Some(rise) = self.rise_threshold {
            if !quote.prev_close.is_zero() && percent >= rise {
                return Some(Breach {
                    kind: AlertKind::Rise,
                    value: percent,
                });
            }
        }

        if let Some(fall) = self.fall_threshold {
            if !quote.prev_close.is_zero() && percent <= -fall {
                return Some(Breach {
                    kind: AlertKind::Fall,
                    value: percent,
                });
            }
        }

        None
    }
}

/// Delivery state of an alert event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Sent,
}

/// One detected threshold breach.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule_id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub kind: AlertKind,
    /// The value that tripped the predicate.
    pub value: Decimal,
    /// Human-readable notification body.
    pub message: String,
    pub created_at: NaiveDateTime,
    pub delivery: DeliveryState,
}

impl AlertEvent {
    /// Build the event for a breach, message included.
    pub fn for_breach(
        rule: &AlertRule,
        quote: &Quote,
        breach: Breach,
        created_at: NaiveDateTime,
    ) -> Self {
        let message = Self::message_for(quote, rule, breach);
        Self {
            rule_id: rule.id,
            user_id: rule.user_id,
            symbol: rule.symbol.clone(),
            kind: breach.kind,
            value: breach.value,
            message,
            created_at,
            delivery: DeliveryState::Pending,
        }
    }

    fn message_for(quote: &Quote, rule: &AlertRule, breach: Breach) -> String {
        let ident = if quote.name.is_empty() {
            quote.symbol.clone()
        } else {
            format!("{} ({})", quote.name, quote.symbol)
        };

        match breach.kind {
            AlertKind::PriceFloor => format!(
                "Stock alert for {}: price {:.2} at or below floor {:.2}",
                ident,
                breach.value,
                rule.price_min.unwrap_or_default()
            ),
            AlertKind::PriceCeiling => format!(
                "Stock alert for {}: price {:.2} at or above ceiling {:.2}",
                ident,
                breach.value,
                rule.price_max.unwrap_or_default()
            ),
            AlertKind::Rise => format!(
                "Stock alert for {}: up {:.2}% (threshold {:.2}%), price {:.2}",
                ident,
                breach.value,
                rule.rise_threshold.unwrap_or_default(),
                quote.price
            ),
            AlertKind::Fall => format!(
                "Stock alert for {}: down {:.2}% (threshold {:.2}%), price {:.2}",
                ident,
                breach.value,
                rule.fall_threshold.unwrap_or_default(),
                quote.price
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_rule() -> AlertRule {
        AlertRule {
            id: 1,
            user_id: 7,
            symbol: "600000".to_string(),
            price_min: None,
            price_max: None,
            rise_threshold: None,
            fall_threshold: None,
            is_active: true,
        }
    }

    fn quote(price: Decimal, prev_close: Decimal) -> Quote {
        let mut quote = Quote::new("600000", "PF Bank", price, "STUB");
        quote.prev_close = prev_close;
        quote
    }

    #[test]
    fn test_floor_breach() {
        let mut rule = base_rule();
        rule.price_min = Some(dec!(10.0));

        let breach = rule.evaluate(&quote(dec!(9.8), dec!(10.5))).expect("breach");
        assert_eq!(breach.kind, AlertKind::PriceFloor);
        assert_eq!(breach.value, dec!(9.8));
    }

    #[test]
    fn test_ceiling_breach() {
        let mut rule = base_rule();
        rule.price_max = Some(dec!(9.5));

        let breach = rule.evaluate(&quote(dec!(9.8), dec!(9.0))).expect("breach");
        assert_eq!(breach.kind, AlertKind::PriceCeiling);
    }

    #[test]
    fn test_first_match_wins() {
        let mut rule = base_rule();
        rule.price_min = Some(dec!(10.0));
        rule.fall_threshold = Some(dec!(2.0));

        // Both floor and fall are breached; the floor check runs first.
        let breach = rule.evaluate(&quote(dec!(9.0), dec!(10.0))).expect("breach");
        assert_eq!(breach.kind, AlertKind::PriceFloor);
    }

    #[test]
    fn test_rise_and_fall_thresholds() {
        let mut rule = base_rule();
        rule.rise_threshold = Some(dec!(5.0));
        let breach = rule.evaluate(&quote(dec!(10.5), dec!(10.0))).expect("breach");
        assert_eq!(breach.kind, AlertKind::Rise);
        assert_eq!(breach.value, dec!(5.0));

        let mut rule = base_rule();
        rule.fall_threshold = Some(dec!(3.0));
        let breach = rule.evaluate(&quote(dec!(9.6), dec!(10.0))).expect("breach");
        assert_eq!(breach.kind, AlertKind::Fall);
        assert_eq!(breach.value, dec!(-4.0));
    }

    #[test]
    fn test_zero_prev_close_never_fires_percent_predicates() {
        let mut rule = base_rule();
        rule.rise_threshold = Some(dec!(0.0));
        rule.fall_threshold = Some(dec!(0.0));

        assert!(rule.evaluate(&quote(dec!(10.0), dec!(0))).is_none());
    }

    #[test]
    fn test_unset_thresholds_never_trigger() {
        assert!(base_rule().evaluate(&quote(dec!(0.01), dec!(100))).is_none());
    }

    #[test]
    fn test_floor_message_contains_price() {
        let mut rule = base_rule();
        rule.price_min = Some(dec!(10.0));
        let q = quote(dec!(9.8), dec!(10.5));
        let breach = rule.evaluate(&q).expect("breach");

        let event = AlertEvent::for_breach(
            &rule,
            &q,
            breach,
            chrono::NaiveDate::from_ymd_opt(2024, 5, 20)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .expect("valid test datetime"),
        );
        assert!(event.message.contains("9.80"), "message: {}", event.message);
        assert!(event.message.contains("PF Bank"));
        assert_eq!(event.delivery, DeliveryState::Pending);
        assert_eq!(event.kind.as_str(), "price_min");
    }
}
