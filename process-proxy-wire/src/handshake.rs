//! The fixed 146-byte handshake block (§3, §4.3, §6).

use crate::error::WireError;

/// `"ProcessProxy 0001 "`, 18 bytes, including the trailing space.
pub const PROTOCOL_PREFIX: &[u8; 18] = b"ProcessProxy 0001 ";

/// Width of the token field that follows the prefix.
pub const TOKEN_FIELD_LEN: usize = 128;

/// Total handshake size: prefix + token field.
pub const HANDSHAKE_LEN: usize = PROTOCOL_PREFIX.len() + TOKEN_FIELD_LEN;

/// Builds the 146-byte handshake block. An empty token yields an
/// all-zero token field. A token longer than 128 bytes is truncated to
/// its first 128 bytes rather than rejected.
pub fn encode(token: &[u8]) -> [u8; HANDSHAKE_LEN] {
    let token = &token[..token.len().min(TOKEN_FIELD_LEN)];

    let mut block = [0u8; HANDSHAKE_LEN];
    block[..PROTOCOL_PREFIX.len()].copy_from_slice(PROTOCOL_PREFIX);
    block[PROTOCOL_PREFIX.len()..PROTOCOL_PREFIX.len() + token.len()].copy_from_slice(token);
    block
}

/// Validates the prefix of a 146-byte handshake block and extracts the
/// token: the prefix of the token field up to (not including) the first
/// zero byte, or the full 128 bytes if none occurs.
pub fn decode(block: &[u8; HANDSHAKE_LEN]) -> Result<Vec<u8>, WireError> {
    if &block[..PROTOCOL_PREFIX.len()] != PROTOCOL_PREFIX {
        return Err(WireError::BadHandshakePrefix);
    }

    let token_field = &block[PROTOCOL_PREFIX.len()..];
    let end = token_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(token_field.len());
    Ok(token_field[..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_all_zero_field() {
        let block = encode(b"");
        assert_eq!(&block[..18], PROTOCOL_PREFIX.as_slice());
        assert!(block[18..].iter().all(|&b| b == 0));
        assert_eq!(decode(&block).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn token_round_trips_for_all_lengths_up_to_128() {
        for len in [1usize, 19, 64, 127, 128] {
            let token: Vec<u8> = (0..len).map(|i| (i % 26) as u8 + b'a').collect();
            let block = encode(&token);
            assert_eq!(decode(&block).unwrap(), token);
        }
    }

    #[test]
    fn token_exceeding_128_bytes_is_truncated_to_the_first_128() {
        let token: Vec<u8> = (0..129).map(|i| (i % 26) as u8 + b'a').collect();
        let block = encode(&token);
        assert_eq!(decode(&block).unwrap(), token[..128].to_vec());
    }

    #[test]
    fn bad_prefix_is_rejected() {
        let mut block = encode(b"hi");
        block[0] = b'X';
        assert!(matches!(decode(&block), Err(WireError::BadHandshakePrefix)));
    }

    #[test]
    fn handshake_is_exactly_146_bytes() {
        assert_eq!(HANDSHAKE_LEN, 146);
        assert_eq!(encode(b"tok").len(), 146);
    }

    #[test]
    fn token_containing_embedded_zero_stops_at_first_zero() {
        let mut block = encode(b"abc");
        // Pretend a later write left a stray zero then more non-zero bytes;
        // the field should already have guaranteed this can't happen via
        // encode(), but decode() must still only honor the first zero.
        block[18 + 3] = 0;
        block[18 + 4] = b'z';
        assert_eq!(decode(&block).unwrap(), b"abc".to_vec());
    }
}
