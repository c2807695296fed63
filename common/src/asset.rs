use crate::{
    config::COIN_DECIMALS,
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// The closed set of denominations the ledger recognizes.
// No other denomination is ever valid in a balance row or journal entry.
#[derive(
    Serialize, Deserialize, Display, EnumString, Clone, Copy, Debug, PartialEq, Eq, Hash,
    PartialOrd, Ord,
)]
pub enum Denomination {
    #[serde(rename = "USDTg")]
    #[strum(serialize = "USDTg")]
    USDTg,
    #[serde(rename = "USDTgV")]
    #[strum(serialize = "USDTgV")]
    USDTgV,
    #[serde(rename = "USDTgG")]
    #[strum(serialize = "USDTgG")]
    USDTgG,
}

impl Denomination {
    pub const ALL: [Denomination; 3] = [
        Denomination::USDTg,
        Denomination::USDTgV,
        Denomination::USDTgG,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Denomination::USDTg => "USDTg",
            Denomination::USDTgV => "USDTgV",
            Denomination::USDTgG => "USDTgG",
        }
    }

    // All denominations of the family share the same fixed-point scale
    pub fn decimals(&self) -> u8 {
        COIN_DECIMALS
    }
}

impl Serializer for Denomination {
    fn write(&self, writer: &mut Writer) {
        let v = match self {
            Denomination::USDTg => 0u8,
            Denomination::USDTgV => 1u8,
            Denomination::USDTgG => 2u8,
        };
        writer.write_u8(v);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(Denomination::USDTg),
            1 => Ok(Denomination::USDTgV),
            2 => Ok(Denomination::USDTgG),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_symbol_roundtrip() {
        for denom in Denomination::ALL {
            assert_eq!(Denomination::from_str(denom.symbol()).unwrap(), denom);
        }
        assert!(Denomination::from_str("USDT").is_err());
    }

    #[test]
    fn test_serializer_roundtrip() {
        for denom in Denomination::ALL {
            assert_eq!(
                Denomination::from_bytes(&denom.to_bytes()).unwrap(),
                denom
            );
        }
    }
}
