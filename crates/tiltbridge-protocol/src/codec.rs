//! 倾角信号定点编解码
//!
//! PGN 61459 的 pitch/roll 字段使用定点编码：
//!
//! ```text
//! physical = (raw - 32000) / 500      // 偏移 −64°，分辨率 0.002°/bit
//! raw ∈ [0, 32255]  =>  physical ∈ [-64.0, 0.51]
//! ```
//!
//! 线路上的每个字段由一对字节承载，`raw = byte0 + byte1`（字节和，
//! 与板上固件一致）。超出 PGN 位域的 raw 值说明帧已损坏，以
//! [`ProtocolError::RawOutOfRange`] 拒绝。

use crate::ProtocolError;

/// PGN 位域上限 raw 值，对应物理角度 0.51°
pub const RAW_MAX: u16 = 32_255;

/// 物理零点偏移：−64° / 0.002° = 32000 bits
pub const RAW_OFFSET: f64 = 32_000.0;

/// 缩放系数：1 / 0.002°
pub const SCALE: f64 = 500.0;

/// 字节对能表达的最大 raw 值（0xFF + 0xFF）
pub const PAIR_RAW_MAX: u16 = 510;

/// 一对载荷字节的原始和
#[inline]
pub fn pair_raw(b0: u8, b1: u8) -> u16 {
    b0 as u16 + b1 as u16
}

/// 解码原始定点值为物理角度（度）
///
/// # 错误
/// - `RawOutOfRange`: `raw > 32255`，超出该 PGN 的位域
pub fn decode_raw(raw: u16) -> Result<f64, ProtocolError> {
    if raw > RAW_MAX {
        return Err(ProtocolError::RawOutOfRange { raw });
    }
    Ok((raw as f64 - RAW_OFFSET) / SCALE)
}

/// 从一对载荷字节解码物理角度（度）
pub fn decode_pair(b0: u8, b1: u8) -> Result<f64, ProtocolError> {
    decode_raw(pair_raw(b0, b1))
}

/// 编码物理角度为一对载荷字节（逆变换，用于测试与合成帧）
///
/// 取最近的可由字节对表达的 raw 值（0..=510），再拆分到两个字节。
/// 字节对之和等于 raw，具体拆分方式线路上不区分。
pub fn encode(value: f64) -> [u8; 2] {
    let raw = (value * SCALE + RAW_OFFSET).round().clamp(0.0, PAIR_RAW_MAX as f64) as u16;
    let b0 = raw.min(0xFF) as u8;
    let b1 = (raw - b0 as u16) as u8;
    [b0, b1]
}

/// 从一个 CanFrame 载荷解码出的倾角仪读数
///
/// pitch 来自 byte 0-1，roll 来自 byte 2-3。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inclinometer {
    /// 俯仰角（度）
    pub pitch: f64,
    /// 横滚角（度）
    pub roll: f64,
}

impl Inclinometer {
    /// 从载荷的前四个字节解码
    ///
    /// # 错误
    /// - `FrameTooShort`: 载荷不足 4 字节
    /// - `RawOutOfRange`: 任一字段超出 PGN 位域
    pub fn from_payload(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < 4 {
            return Err(ProtocolError::FrameTooShort {
                actual: payload.len(),
            });
        }
        Ok(Self {
            pitch: decode_pair(payload[0], payload[1])?,
            roll: decode_pair(payload[2], payload[3])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_raw_domain_bounds() {
        // 位域两端：(0 - 32000)/500 = -64.0° 和 (32255 - 32000)/500 = 0.51°
        assert_eq!(decode_raw(0).unwrap(), -64.0);
        assert!((decode_raw(RAW_MAX).unwrap() - 0.51).abs() < 1e-9);
    }

    #[test]
    fn test_decode_raw_out_of_domain() {
        assert_eq!(
            decode_raw(RAW_MAX + 1),
            Err(ProtocolError::RawOutOfRange { raw: 32_256 })
        );
        assert!(decode_raw(u16::MAX).is_err());
    }

    #[test]
    fn test_decode_pair_uses_byte_sum() {
        // 0xFF + 0xFF = 510 bits
        let expected = (510.0 - RAW_OFFSET) / SCALE;
        assert_eq!(decode_pair(0xFF, 0xFF).unwrap(), expected);
        // 拆分方式不影响结果
        assert_eq!(decode_pair(0x10, 0x20), decode_pair(0x20, 0x10));
    }

    #[test]
    fn test_encode_splits_byte_sum() {
        let pair = encode(decode_pair(0xFF, 0xFF).unwrap());
        assert_eq!(pair[0] as u16 + pair[1] as u16, 510);

        let pair = encode(-64.0);
        assert_eq!(pair, [0, 0]);
    }

    #[test]
    fn test_from_payload() {
        let inc = Inclinometer::from_payload(&[0, 0, 0xFF, 0xFF]).unwrap();
        assert_eq!(inc.pitch, -64.0);
        assert_eq!(inc.roll, decode_raw(510).unwrap());
    }

    #[test]
    fn test_from_payload_too_short() {
        assert_eq!(
            Inclinometer::from_payload(&[1, 2, 3]),
            Err(ProtocolError::FrameTooShort { actual: 3 })
        );
    }

    proptest! {
        /// 对任意字节对，decode(encode(decode(pair))) 与 decode(pair)
        /// 的偏差不超过一个编码步长（0.002°）
        #[test]
        fn prop_roundtrip_within_one_step(b0: u8, b1: u8) {
            let phys = decode_pair(b0, b1).unwrap();
            let pair = encode(phys);
            let phys2 = decode_pair(pair[0], pair[1]).unwrap();
            prop_assert!((phys2 - phys).abs() <= 0.002);
        }

        /// 编码结果的字节和始终落在可解码域内
        #[test]
        fn prop_encode_always_decodable(value in -64.0f64..=0.51) {
            let pair = encode(value);
            prop_assert!(decode_pair(pair[0], pair[1]).is_ok());
        }
    }
}
