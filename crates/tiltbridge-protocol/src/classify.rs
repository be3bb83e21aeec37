//! 帧分类器：从载荷字节推导 LED 执行器状态
//!
//! 阈值规则（教学板固件语义）：
//!
//! - byte 0 ∈ [0x80, 0xFF] => LED1 亮，否则灭
//! - byte 1 ∈ [0x80, 0xFF] => LED2 亮，否则灭
//! - 倾角字段规则按序套用，后一条覆盖前一条：
//!   byte 0+1 之和 > 0x7F => LED3 亮，否则灭；
//!   byte 2+3 之和 > 0x7F => LED3 亮，否则灭。
//!
//! 阈值作用在缩放前的字节和上，不作用在物理角度上。

use crate::ProtocolError;
use crate::codec::pair_raw;

/// LED3 的原始字节和阈值
pub const LED3_RAW_THRESHOLD: u16 = 0x7F;

/// 三个 LED 执行器的离散状态
///
/// 构造后按值流动；共享发布由驱动层负责（单写者，整体原子替换），
/// 保证读者不会观察到撕裂状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub led1: bool,
    pub led2: bool,
    pub led3: bool,
}

impl ActuatorState {
    /// 全灭状态（控制器启动/重启时的初始值）
    pub const OFF: Self = Self {
        led1: false,
        led2: false,
        led3: false,
    };
}

/// 对一个帧载荷分类，得到 LED 状态
///
/// # 错误
/// - `FrameTooShort`: 载荷不足 4 字节，整帧跳过分类
pub fn classify(payload: &[u8]) -> Result<ActuatorState, ProtocolError> {
    if payload.len() < 4 {
        return Err(ProtocolError::FrameTooShort {
            actual: payload.len(),
        });
    }

    let led1 = payload[0] >= 0x80;
    let led2 = payload[1] >= 0x80;

    // LED3 规则按字段顺序套用，每条规则覆盖上一条的结果
    let mut led3 = false;
    for field in [[payload[0], payload[1]], [payload[2], payload[3]]] {
        led3 = pair_raw(field[0], field[1]) > LED3_RAW_THRESHOLD;
    }

    Ok(ActuatorState { led1, led2, led3 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led1_threshold() {
        let state = classify(&[0x80, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(
            state,
            ActuatorState {
                led1: true,
                led2: false,
                led3: false
            }
        );
        assert!(!classify(&[0x7F, 0x00, 0x00, 0x00]).unwrap().led1);
    }

    #[test]
    fn test_led2_threshold() {
        // byte 2+3 之和为 0，LED3 灭
        let state = classify(&[0x7F, 0xFF, 0x00, 0x00]).unwrap();
        assert_eq!(
            state,
            ActuatorState {
                led1: false,
                led2: true,
                led3: false
            }
        );
    }

    #[test]
    fn test_led3_from_roll_field() {
        // byte 2+3 之和 510 > 0x7F
        let state = classify(&[0x00, 0x00, 0xFF, 0xFF]).unwrap();
        assert!(state.led3);
        assert!(!state.led1);
        assert!(!state.led2);
    }

    #[test]
    fn test_led3_last_rule_wins() {
        // pitch 字段超阈值但 roll 字段未超：后一条规则覆盖，LED3 灭
        let state = classify(&[0xFF, 0xFF, 0x00, 0x00]).unwrap();
        assert!(!state.led3);
    }

    #[test]
    fn test_led3_boundary() {
        // 和恰为 0x7F 不亮，0x80 亮
        assert!(!classify(&[0x00, 0x00, 0x7F, 0x00]).unwrap().led3);
        assert!(classify(&[0x00, 0x00, 0x80, 0x00]).unwrap().led3);
    }

    #[test]
    fn test_short_payload_rejected() {
        assert_eq!(
            classify(&[0x80, 0x80, 0x80]),
            Err(ProtocolError::FrameTooShort { actual: 3 })
        );
        assert!(classify(&[]).is_err());
    }

    #[test]
    fn test_default_is_all_off() {
        assert_eq!(ActuatorState::default(), ActuatorState::OFF);
    }
}
