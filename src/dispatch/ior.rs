//! IOR dispatcher
//!
//! Every read the card answers holds the host first, then drives the byte.
//! Reads nobody claims release the bus without driving data.

use crate::bus::{Response, ResponseSink};
use crate::control::{ControlState, FirmwareUpdater, CONTROL_PORT, DATA_PORT_HIGH, DATA_PORT_LOW};
use crate::device::{Device, ReadAccess};

/// Handle one IOR cycle
#[inline]
pub fn handle_read<D: Device, U: FirmwareUpdater, S: ResponseSink>(
    port: u16,
    control: &mut ControlState,
    device: &mut D,
    updater: &U,
    sink: &mut S,
) {
    let value = match port {
        CONTROL_PORT => {
            sink.push(Response::Hold);
            control.selected_register()
        }
        DATA_PORT_LOW => {
            sink.push(Response::Hold);
            control.read_low::<D>()
        }
        DATA_PORT_HIGH => {
            sink.push(Response::Hold);
            control.read_high::<D, U>(updater)
        }
        _ => match device.decode(port, control.base_port()) {
            Some((offset, span)) => match span.read {
                ReadAccess::Device => {
                    sink.push(Response::Hold);
                    device.read(offset)
                }
                ReadAccess::Sentinel(value) => {
                    sink.push(Response::Hold);
                    value
                }
                ReadAccess::None => {
                    sink.push(Response::Done);
                    return;
                }
            },
            None => {
                sink.push(Response::Done);
                return;
            }
        },
    };
    sink.push(Response::Data(value));
}
