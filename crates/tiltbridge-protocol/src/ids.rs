//! CAN ID / PGN 常量定义
//!
//! 字节序约定：倾角仪 PGN 载荷按字段成对出现（pitch = byte 0-1，
//! roll = byte 2-3），见 [`crate::codec`]。

/// 倾角仪（slope sensor）的 PGN
///
/// SAE J1939 PGN 61459 (0xF013)，PDU2 格式。
pub const PGN_SLOPE_SENSOR: u32 = 61_459;

/// 外发通道的心跳帧 ID（扩展帧，29-bit）
pub const ID_HEARTBEAT: u32 = 0xC0FFE;

/// 心跳帧载荷（教学板固定图样）
pub const HEARTBEAT_PAYLOAD: [u8; 8] = [0xFF, 0x01, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xFF];

/// 从 29-bit J1939 ID 中提取 PGN
///
/// PDU1（PF < 240）：PS 字节是目标地址，不属于 PGN，置 0；
/// PDU2（PF >= 240）：PS 字节是组扩展，属于 PGN。
pub fn pgn_of(id: u32) -> u32 {
    let pf = (id >> 16) & 0xFF;
    if pf < 240 {
        (id >> 8) & 0x3FF00
    } else {
        (id >> 8) & 0x3FFFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pgn_of_pdu2_slope_sensor() {
        // 源地址 0x21，优先级 3 的典型倾角仪帧
        let id = (3 << 26) | (PGN_SLOPE_SENSOR << 8) | 0x21;
        assert_eq!(pgn_of(id), PGN_SLOPE_SENSOR);
    }

    #[test]
    fn test_pgn_of_pdu1_masks_destination() {
        // PF = 0xEA (< 240)，PS 是目标地址，不计入 PGN
        assert_eq!(pgn_of(0x18EAFF21), 0xEA00);
    }

    #[test]
    fn test_slope_sensor_pgn_value() {
        assert_eq!(PGN_SLOPE_SENSOR, 0xF013);
    }
}
