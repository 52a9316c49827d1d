use pnet::datalink::{self, Channel, NetworkInterface};

use crate::error::TransmissionError;
use crate::net::frame::EthernetArpFrame;

pub trait Transmit {
    /// Emits exactly one frame on `interface`.
    fn transmit(&mut self, interface: &str, frame: &EthernetArpFrame) -> Result<(), TransmissionError>;
}

/// Sends through an `AF_PACKET` socket bound to the interface. A fresh
/// channel is opened for every frame and dropped before `transmit` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkTransmitter;

impl Transmit for LinkTransmitter {
    fn transmit(&mut self, interface: &str, frame: &EthernetArpFrame) -> Result<(), TransmissionError> {
        let device = get_interface(interface)?;
        let mut tx = match datalink::channel(&device, datalink::Config::default()) {
            Ok(Channel::Ethernet(tx, _)) => tx,
            Ok(_) => return Err(TransmissionError::UnsupportedChannel(interface.to_string())),
            Err(source) => {
                return Err(TransmissionError::Open {
                    interface: interface.to_string(),
                    source,
                })
            }
        };
        let bytes = frame.to_bytes();
        tracing::trace!("sending {} bytes on {}: {:02x?}", bytes.len(), interface, bytes);
        match tx.send_to(&bytes, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(source)) => Err(TransmissionError::Send {
                interface: interface.to_string(),
                source,
            }),
            None => Err(TransmissionError::NotAccepted(interface.to_string())),
        }
    }
}

pub fn get_interface(name: &str) -> Result<NetworkInterface, TransmissionError> {
    datalink::interfaces()
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| TransmissionError::InterfaceNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interface() {
        let err = get_interface("frr-netops-no-such-if0").unwrap_err();
        assert!(matches!(err, TransmissionError::InterfaceNotFound(name) if name == "frr-netops-no-such-if0"));
    }
}
