use alloy::primitives::{Address, B256, U256};
/// Lowercase `0x`-prefixed form, used wherever addresses are compared as text.
pub fn address_to_hex_string(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Storage word holding `value` as a big-endian uint256.
pub fn u256_to_word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

pub fn word_to_u256(word: B256) -> U256 {
    U256::from_be_bytes(word.0)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use super::*;

    #[test]
    fn test_address_to_hex_string_is_lowercase() {
        let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(
            address_to_hex_string(&usdc),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
    }

    #[test]
    fn test_word_conversions() {
        let amount = U256::from(100_000_000u64);
        let word = u256_to_word(amount);

        assert_eq!(
            word,
            b256!("0000000000000000000000000000000000000000000000000000000005f5e100")
        );
        assert_eq!(word_to_u256(word), amount);
    }
}
