//! IOW dispatcher
//!
//! Routing order: control port, data ports, device region, everything else.
//! Each cycle gets exactly one terminal response. Fast paths push it before
//! doing any work so the host is released as early as possible.

use crate::bus::{Response, ResponseSink};
use crate::control::{
    ControlRegister, ControlState, FirmwareUpdater, CONTROL_PORT, DATA_PORT_HIGH, DATA_PORT_LOW,
    UNLOCK_MAGIC,
};
use crate::device::{Device, WriteTiming};

/// Handle one IOW cycle
#[inline]
pub fn handle_write<D: Device, U: FirmwareUpdater, S: ResponseSink>(
    port: u16,
    value: u8,
    control: &mut ControlState,
    device: &mut D,
    updater: &mut U,
    sink: &mut S,
) {
    match port {
        CONTROL_PORT => {
            sink.push(Response::Hold);
            if value == UNLOCK_MAGIC {
                control.unlock();
            } else if control.is_active() {
                control.select::<D, U>(value, updater);
            }
            sink.push(Response::Done);
        }
        DATA_PORT_LOW | DATA_PORT_HIGH => {
            let timing = data_port_timing(control);
            if timing == WriteTiming::Fast {
                sink.push(Response::Done);
            } else {
                sink.push(Response::Hold);
            }
            if control.is_active() {
                if port == DATA_PORT_LOW {
                    control.write_low(value);
                } else {
                    control.write_high(value, device, updater);
                }
            }
            if timing == WriteTiming::Slow {
                sink.push(Response::Done);
            }
        }
        _ => match device.decode(port, control.base_port()) {
            Some((offset, span)) => match span.write {
                Some(WriteTiming::Fast) => {
                    sink.push(Response::Done);
                    device.write(offset, value);
                }
                Some(WriteTiming::Slow) => {
                    sink.push(Response::Hold);
                    device.write(offset, value);
                    sink.push(Response::Done);
                }
                None => sink.push(Response::Done),
            },
            None => sink.push(Response::Done),
        },
    }
}

/// Data port writes only need the host held while a firmware byte is stored
#[inline(always)]
fn data_port_timing(control: &ControlState) -> WriteTiming {
    if control.selected_register() == ControlRegister::FIRMWARE_UPDATE {
        WriteTiming::Slow
    } else {
        WriteTiming::Fast
    }
}
