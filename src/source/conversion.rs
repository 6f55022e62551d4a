use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::RawSource;

/// Direction of a fresh-bag category conversion recorded at Stage D.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversionDirection {
    GeneralToStandalone,
    StandaloneToGeneral,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("conversion quantity must be positive")]
    ZeroQuantity,
    #[error("{category} balance would drop to {balance}")]
    NegativeBalance {
        category: &'static str,
        balance: i64,
    },
}

/// Category balances after Stage D conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryBalance {
    pub general: i64,
    pub standalone: i64,
}

pub fn category_balance(raw: &RawSource) -> CategoryBalance {
    let value = |v: Option<u32>| v.map(i64::from).unwrap_or(0);
    let gen_to_solo = value(raw.d.fb_gen_to_solo);
    let solo_to_gen = value(raw.d.fb_solo_to_gen);
    CategoryBalance {
        general: value(raw.a.fb_gen) + value(raw.d.fb_gen_increase) + solo_to_gen - gen_to_solo,
        standalone: value(raw.a.fb_solo) + gen_to_solo - solo_to_gen,
    }
}

/// Records a conversion, or leaves `raw` untouched if either category would
/// go negative.
pub fn apply_conversion(
    raw: &mut RawSource,
    direction: ConversionDirection,
    quantity: u32,
) -> Result<CategoryBalance, ConversionError> {
    if quantity == 0 {
        return Err(ConversionError::ZeroQuantity);
    }
    let mut candidate = raw.clone();
    let slot = match direction {
        ConversionDirection::GeneralToStandalone => &mut candidate.d.fb_gen_to_solo,
        ConversionDirection::StandaloneToGeneral => &mut candidate.d.fb_solo_to_gen,
    };
    *slot = Some(slot.unwrap_or(0).saturating_add(quantity));

    let balance = category_balance(&candidate);
    if balance.general < 0 {
        return Err(ConversionError::NegativeBalance {
            category: "general",
            balance: balance.general,
        });
    }
    if balance.standalone < 0 {
        return Err(ConversionError::NegativeBalance {
            category: "standalone",
            balance: balance.standalone,
        });
    }
    *raw = candidate;
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::{apply_conversion, ConversionDirection, ConversionError};
    use crate::source::RawSource;

    fn allocated(general: u32, standalone: u32) -> RawSource {
        let mut raw = RawSource::default();
        raw.a.fb_gen = Some(general);
        raw.a.fb_solo = Some(standalone);
        raw
    }

    #[test]
    fn accepts_conversion_within_balance() {
        let mut raw = allocated(20, 90);
        let balance =
            apply_conversion(&mut raw, ConversionDirection::StandaloneToGeneral, 5).unwrap();
        assert_eq!(balance.general, 25);
        assert_eq!(balance.standalone, 85);
        assert_eq!(raw.d.fb_solo_to_gen, Some(5));

        apply_conversion(&mut raw, ConversionDirection::StandaloneToGeneral, 3).unwrap();
        assert_eq!(raw.d.fb_solo_to_gen, Some(8));
    }

    #[test]
    fn withholds_write_when_balance_goes_negative() {
        let mut raw = allocated(2, 10);
        let err =
            apply_conversion(&mut raw, ConversionDirection::GeneralToStandalone, 3).unwrap_err();
        assert_eq!(
            err,
            ConversionError::NegativeBalance {
                category: "general",
                balance: -1,
            }
        );
        assert_eq!(raw.d.fb_gen_to_solo, None);
    }

    #[test]
    fn rejects_zero_quantity() {
        let mut raw = allocated(2, 10);
        assert_eq!(
            apply_conversion(&mut raw, ConversionDirection::GeneralToStandalone, 0),
            Err(ConversionError::ZeroQuantity)
        );
    }
}
