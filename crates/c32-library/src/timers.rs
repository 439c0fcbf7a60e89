//! On/off delay timers.
//!
//! Inputs are `[in, delay_ms, reset]`, outputs `[out, left_ms]`. The
//! remaining time lives in the `left_ms` output, so the timers carry no
//! hidden state and can be inspected or preset over the link.

use c32_blocks::{BlockLogic, FunctionBlock, FunctionLibrary, IoInit, IoValue};

use crate::LIB_ID_TIMERS;

pub const ON_DELAY: u8 = 0;
pub const OFF_DELAY: u8 = 1;

pub const NAMES: &[&str] = &["ON_DELAY", "OFF_DELAY"];

pub const DEFAULT_DELAY_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Output follows a rising input after the delay; falls immediately.
    OnDelay,
    /// Output follows a falling input after the delay; rises immediately.
    OffDelay,
}

impl BlockLogic for Timer {
    fn name(&self) -> &'static str {
        match self {
            Self::OnDelay => NAMES[ON_DELAY as usize],
            Self::OffDelay => NAMES[OFF_DELAY as usize],
        }
    }

    fn run(&mut self, inputs: &[IoValue], outputs: &mut [IoValue], dt_ms: u32) {
        let input = inputs[0].as_bool();
        let delay = inputs[1].as_u32();
        let reset = inputs[2].as_bool();
        let mut out = outputs[0].as_bool();
        let mut left = outputs[1].as_u32();

        // `idle` is the output level the timer settles to without delay
        let (active, idle) = match self {
            Self::OnDelay => (input, false),
            Self::OffDelay => (!input, true),
        };

        if !active {
            out = idle;
            left = 0;
        } else if reset {
            out = input;
            left = 0;
        } else if out == idle {
            if left == 0 {
                // start
                if delay <= dt_ms {
                    out = !idle;
                } else {
                    left = delay - dt_ms;
                }
            } else if left <= dt_ms {
                out = !idle;
                left = 0;
            } else {
                left -= dt_ms;
            }
        }

        outputs[0] = IoValue::from_bool(out);
        outputs[1] = IoValue::from_u32(left);
    }
}

pub struct Library;

impl FunctionLibrary for Library {
    fn id(&self) -> u8 {
        LIB_ID_TIMERS
    }

    fn name(&self) -> &'static str {
        "Timers"
    }

    fn function_names(&self) -> &'static [&'static str] {
        NAMES
    }

    fn create(&self, function: u8, _inputs: u8, _outputs: u8) -> Option<FunctionBlock> {
        let (timer, idle) = match function {
            ON_DELAY => (Timer::OnDelay, false),
            OFF_DELAY => (Timer::OffDelay, true),
            _ => return None,
        };
        let inputs = [
            IoInit::bool(idle),
            IoInit::time(DEFAULT_DELAY_MS),
            IoInit::bool(false),
        ];
        let outputs = [IoInit::bool(idle), IoInit::time(0)];
        crate::build(LIB_ID_TIMERS, function, &inputs, &outputs, timer)
    }
}
