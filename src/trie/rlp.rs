use crate::error::RlpError;

/// Canonical self-describing encoding for byte strings and nested lists.
/// Injective over arbitrarily nested strings/lists, so node encodings are
/// unambiguous and safe to hash.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RlpData {
    String(Vec<u8>),
    List(Vec<RlpData>),
}

/// Minimal big-endian representation of a length (no leading zeros).
fn length_to_minimal_bytes(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let first_non_zero = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[first_non_zero..].to_vec()
}

fn to_integer(data: &[u8]) -> usize {
    let mut result = 0;
    for &byte in data {
        result = (result << 8) | byte as usize;
    }
    result
}

fn encode_length(l: usize, offset: u8) -> Vec<u8> {
    if l <= 55 {
        vec![(l as u8) + offset]
    } else {
        let len_bytes = length_to_minimal_bytes(l);
        let mut result = vec![(len_bytes.len() as u8) + offset + 55];
        result.extend_from_slice(&len_bytes);
        result
    }
}

/// Long-form payload lengths must use the fewest bytes possible, otherwise
/// one value would have several encodings and hashing would not be injective
/// over decoded values.
fn decode_long_length(data: &[u8], len_of_len: usize) -> Result<usize, RlpError> {
    if data.len() < len_of_len + 1 {
        return Err(RlpError::Truncated {
            needed: len_of_len + 1 - data.len(),
        });
    }
    let len_bytes = &data[1..len_of_len + 1];
    if len_bytes[0] == 0 {
        return Err(RlpError::NonMinimalLength);
    }
    let payload_len = to_integer(len_bytes);
    if payload_len <= 55 {
        // should have used the short form
        return Err(RlpError::NonMinimalLength);
    }
    Ok(payload_len)
}

fn decode_item(data: &[u8]) -> Result<(RlpData, usize), RlpError> {
    let full_len = data.len();

    if full_len == 0 {
        return Err(RlpError::EmptyInput);
    }

    let prefix = data[0];

    match prefix {
        0..=0x7f => {
            // Single byte, encoded as itself
            Ok((RlpData::String(vec![prefix]), 1))
        }
        0x80..=0xb7 => {
            let payload_len = (prefix - 0x80) as usize;

            if full_len < payload_len + 1 {
                return Err(RlpError::Truncated {
                    needed: payload_len + 1 - full_len,
                });
            }

            Ok((
                RlpData::String(data[1..payload_len + 1].to_vec()),
                payload_len + 1,
            ))
        }
        0xb8..=0xbf => {
            // Long string (56+ bytes)
            let len_of_len = (prefix - 0xb7) as usize;
            let payload_len = decode_long_length(data, len_of_len)?;
            if full_len < len_of_len + 1 + payload_len {
                return Err(RlpError::Truncated {
                    needed: len_of_len + 1 + payload_len - full_len,
                });
            }
            let start = len_of_len + 1;
            let end = start + payload_len;
            Ok((RlpData::String(data[start..end].to_vec()), end))
        }
        0xc0..=0xf7 => {
            let list_len = (prefix - 0xc0) as usize;
            if full_len < list_len + 1 {
                return Err(RlpError::Truncated {
                    needed: list_len + 1 - full_len,
                });
            }

            let items = decode_list_payload(&data[1..list_len + 1])?;
            Ok((RlpData::List(items), 1 + list_len))
        }
        0xf8..=0xff => {
            let len_of_len = (prefix - 0xf7) as usize;
            let payload_len = decode_long_length(data, len_of_len)?;
            if full_len < len_of_len + 1 + payload_len {
                return Err(RlpError::Truncated {
                    needed: len_of_len + 1 + payload_len - full_len,
                });
            }
            let start = len_of_len + 1;
            let end = start + payload_len;
            let items = decode_list_payload(&data[start..end])?;
            Ok((RlpData::List(items), end))
        }
    }
}

fn decode_list_payload(mut payload: &[u8]) -> Result<Vec<RlpData>, RlpError> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, consumed) = decode_item(payload)?;
        items.push(item);
        payload = &payload[consumed..];
    }
    Ok(items)
}

pub fn encode_rlp(data: &RlpData) -> Vec<u8> {
    match data {
        RlpData::String(bytes) => {
            if bytes.len() == 1 && bytes[0] < 0x80 {
                return bytes.clone();
            }
            let mut encoded_data = encode_length(bytes.len(), 0x80);
            encoded_data.extend_from_slice(bytes);
            encoded_data
        }
        RlpData::List(items) => {
            let mut combined_data = Vec::new();
            for item in items {
                combined_data.extend_from_slice(&encode_rlp(item));
            }
            let mut encoded_data = encode_length(combined_data.len(), 0xc0);
            encoded_data.extend_from_slice(&combined_data);
            encoded_data
        }
    }
}

/// Strict inverse of [`encode_rlp`]: the whole input must be consumed by a
/// single top-level item.
pub fn decode_rlp(data: &[u8]) -> Result<RlpData, RlpError> {
    let (item, consumed) = decode_item(data)?;
    if consumed != data.len() {
        return Err(RlpError::TrailingBytes(data.len() - consumed));
    }
    Ok(item)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn encode_empty_string() {
        assert_eq!(encode_rlp(&RlpData::String(vec![])), vec![0x80]);
    }

    #[test]
    fn encode_single_byte() {
        assert_eq!(encode_rlp(&RlpData::String(vec![0x7f])), vec![0x7f]);
        assert_eq!(encode_rlp(&RlpData::String(vec![0x00])), vec![0x00]);
        assert_eq!(encode_rlp(&RlpData::String(vec![0x80])), vec![0x81, 0x80]);
    }

    #[test]
    fn encode_short_string() {
        let data = vec![0x01, 0x02, 0x03];
        assert_eq!(
            encode_rlp(&RlpData::String(data)),
            vec![0x83, 0x01, 0x02, 0x03]
        );

        // 55 bytes exactly stays on the short form
        let data = vec![0x01; 55];
        let mut expected = vec![0xb7];
        expected.extend_from_slice(&data);
        assert_eq!(encode_rlp(&RlpData::String(data)), expected);
    }

    #[test]
    fn encode_long_string() {
        // 56 bytes, just over the threshold
        let data = vec![0x01; 56];
        let mut expected = vec![0xb8, 56];
        expected.extend_from_slice(&data);
        assert_eq!(encode_rlp(&RlpData::String(data)), expected);

        let data = vec![0x01; 1024];
        let mut expected = vec![0xb9, 0x04, 0x00];
        expected.extend_from_slice(&data);
        assert_eq!(encode_rlp(&RlpData::String(data)), expected);
    }

    #[test]
    fn encode_short_list() {
        let encoded = encode_rlp(&RlpData::List(vec![
            RlpData::String(b"cat".to_vec()),
            RlpData::String(b"dog".to_vec()),
        ]));
        let mut expected = vec![0xc8];
        expected.extend_from_slice(&[0x83, 0x63, 0x61, 0x74, 0x83, 0x64, 0x6f, 0x67]);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn encode_empty_list() {
        assert_eq!(encode_rlp(&RlpData::List(vec![])), vec![0xc0]);
    }

    #[test]
    fn encode_long_list() {
        let data = vec![vec![0x01; 60], vec![0x02; 60], vec![0x03; 60]];
        let encoded = encode_rlp(&RlpData::List(
            data.into_iter().map(RlpData::String).collect(),
        ));

        // 3 items of 60 + 2 header bytes each = 186 bytes of payload
        assert_eq!(encoded[0], 0xf8);
        assert_eq!(encoded[1], 186);
        assert_eq!(encoded.len(), 188);
    }

    #[test]
    fn decode_single_byte() {
        assert_eq!(decode_rlp(&[0x7f]).unwrap(), RlpData::String(vec![0x7f]));
        assert_eq!(decode_rlp(&[0x00]).unwrap(), RlpData::String(vec![0x00]));
    }

    #[test]
    fn decode_short_string() {
        assert_eq!(
            decode_rlp(&[0x83, 0x63, 0x61, 0x74]).unwrap(),
            RlpData::String(b"cat".to_vec())
        );
    }

    #[test]
    fn decode_list_of_lists() {
        // [["dog", "puppy"], "cat"]
        let data = vec![
            0xcf, 0xca, 0x83, 0x64, 0x6f, 0x67, 0x85, 0x70, 0x75, 0x70, 0x70, 0x79, 0x83, 0x63,
            0x61, 0x74,
        ];

        let decoded = decode_rlp(&data).unwrap();
        assert_eq!(
            decoded,
            RlpData::List(vec![
                RlpData::List(vec![
                    RlpData::String(b"dog".to_vec()),
                    RlpData::String(b"puppy".to_vec()),
                ]),
                RlpData::String(b"cat".to_vec()),
            ])
        );
    }

    #[test]
    fn decode_roundtrip() {
        let original = RlpData::List(vec![
            RlpData::String(b"hello".to_vec()),
            RlpData::List(vec![
                RlpData::String(b"nested".to_vec()),
                RlpData::String(vec![0x01; 70]),
            ]),
            RlpData::String(vec![]),
        ]);

        let encoded = encode_rlp(&original);
        assert_eq!(decode_rlp(&encoded).unwrap(), original);
    }

    #[test]
    fn decode_rejects_empty_input() {
        assert_eq!(decode_rlp(&[]), Err(RlpError::EmptyInput));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        // Claims a 4-byte string, provides 2
        assert!(matches!(
            decode_rlp(&[0x84, 0x01, 0x02]),
            Err(RlpError::Truncated { .. })
        ));
    }

    #[test]
    fn decode_rejects_non_minimal_length() {
        // 55-byte payload dressed up in the long form
        let mut data = vec![0xb8, 55];
        data.extend_from_slice(&[0x01; 55]);
        assert_eq!(decode_rlp(&data), Err(RlpError::NonMinimalLength));

        // leading zero in the length-of-length bytes
        let mut data = vec![0xb9, 0x00, 56];
        data.extend_from_slice(&[0x01; 56]);
        assert_eq!(decode_rlp(&data), Err(RlpError::NonMinimalLength));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        assert_eq!(
            decode_rlp(&[0x83, 0x63, 0x61, 0x74, 0xff]),
            Err(RlpError::TrailingBytes(1))
        );
    }
}
