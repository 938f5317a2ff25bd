//! Symbol-to-exchange mapping for A-share codes.
//!
//! The listing exchange is encoded in the first digit of the symbol:
//! codes starting with 6, 9 or 5 trade in Shanghai, everything else in
//! Shenzhen. Vendors address instruments either by a `{market}.{code}`
//! secid (Eastmoney) or an `sh`/`sz` prefix (Sina).

/// Exchange a symbol trades on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Exchange {
    Shanghai,
    Shenzhen,
}

impl Exchange {
    /// Classify a symbol by its leading digit.
    pub fn of(symbol: &str) -> Self {
        if symbol.starts_with('6') || symbol.starts_with('9') || symbol.starts_with('5') {
            Self::Shanghai
        } else {
            Self::Shenzhen
        }
    }

    /// Eastmoney market code ("1" Shanghai, "0" Shenzhen).
    pub fn market_code(self) -> &'static str {
        match self {
            Self::Shanghai => "1",
            Self::Shenzhen => "0",
        }
    }

    /// Sina symbol prefix ("sh"/"sz").
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Shanghai => "sh",
            Self::Shenzhen => "sz",
        }
    }
}

/// Eastmoney security id for a symbol, e.g. "1.600000".
pub fn secid(symbol: &str) -> String {
    format!("{}.{}", Exchange::of(symbol).market_code(), symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_classification() {
        assert_eq!(Exchange::of("600000"), Exchange::Shanghai);
        assert_eq!(Exchange::of("900901"), Exchange::Shanghai);
        assert_eq!(Exchange::of("510300"), Exchange::Shanghai);
        assert_eq!(Exchange::of("000001"), Exchange::Shenzhen);
        assert_eq!(Exchange::of("300750"), Exchange::Shenzhen);
    }

    #[test]
    fn test_secid() {
        assert_eq!(secid("600000"), "1.600000");
        assert_eq!(secid("000001"), "0.000001");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(Exchange::of("600000").prefix(), "sh");
        assert_eq!(Exchange::of("002594").prefix(), "sz");
    }
}
