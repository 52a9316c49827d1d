//! Ethernet + ARP frame layout.
//!
//! ```notrust
//!  0                   6                  12     14
//!  | destination MAC   | source MAC       | 0x0806 |
//! 14     16     18  19  20     22           28       32           38       42
//!  | htype | ptype | hl | pl | oper | sender MAC | sender IP | target MAC | target IP |
//! ```
//!
//! Every multi-byte field is big-endian. Serialization goes through the
//! pnet packet views so each field is written at its named offset.

use std::convert::TryFrom;
use std::net::Ipv4Addr;

use pnet::datalink::MacAddr;
use pnet::packet::arp::{ArpHardwareType, ArpHardwareTypes, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::Packet;

use crate::error::InvalidAddressError;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ARP_PACKET_LEN: usize = 28;
pub const FRAME_LEN: usize = ETHERNET_HEADER_LEN + ARP_PACKET_LEN;

pub const ETHERTYPE_OFFSET: usize = 12;
pub const ARP_OPERATION_OFFSET: usize = ETHERNET_HEADER_LEN + 6;
pub const ARP_SENDER_HW_OFFSET: usize = ETHERNET_HEADER_LEN + 8;
pub const ARP_SENDER_PROTO_OFFSET: usize = ARP_SENDER_HW_OFFSET + HW_ADDR_LEN as usize;
pub const ARP_TARGET_HW_OFFSET: usize = ARP_SENDER_PROTO_OFFSET + PROTO_ADDR_LEN as usize;
pub const ARP_TARGET_PROTO_OFFSET: usize = ARP_TARGET_HW_OFFSET + HW_ADDR_LEN as usize;

pub const HW_ADDR_LEN: u8 = 6;
pub const PROTO_ADDR_LEN: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    Request = 1,
    Reply = 2,
}

impl ArpOperation {
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for ArpOperation {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ArpOperation::Request),
            2 => Ok(ArpOperation::Reply),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetArpFrame {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub hardware_type: ArpHardwareType,
    pub protocol_type: EtherType,
    pub hw_addr_len: u8,
    pub proto_addr_len: u8,
    /// Raw operation code, `ArpOperation` covers the two this tool sends.
    pub operation: u16,
    pub sender_hw_addr: MacAddr,
    pub sender_proto_addr: Ipv4Addr,
    pub target_hw_addr: MacAddr,
    pub target_proto_addr: Ipv4Addr,
}

impl EthernetArpFrame {
    /// Ethernet destination is always broadcast, whatever the operation.
    pub fn new(
        interface_mac: MacAddr,
        sender_ip: Ipv4Addr,
        operation: ArpOperation,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            destination: MacAddr::broadcast(),
            source: interface_mac,
            hardware_type: ArpHardwareTypes::Ethernet,
            protocol_type: EtherTypes::Ipv4,
            hw_addr_len: HW_ADDR_LEN,
            proto_addr_len: PROTO_ADDR_LEN,
            operation: operation.code(),
            sender_hw_addr: interface_mac,
            sender_proto_addr: sender_ip,
            target_hw_addr: target_mac,
            target_proto_addr: target_ip,
        }
    }

    /// Flood-style announcement: the target hardware address is broadcast
    /// for requests and replies alike.
    pub fn announcement(
        interface_mac: MacAddr,
        sender_ip: Ipv4Addr,
        operation: ArpOperation,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self::new(
            interface_mac,
            sender_ip,
            operation,
            MacAddr::broadcast(),
            target_ip,
        )
    }

    pub fn arp_operation(&self) -> Option<ArpOperation> {
        ArpOperation::try_from(self.operation).ok()
    }

    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut buffer = [0u8; FRAME_LEN];
        // Both views are sized from the layout constants, so they always fit.
        if let Some(mut arp) = MutableArpPacket::new(&mut buffer[ETHERNET_HEADER_LEN..]) {
            arp.set_hardware_type(self.hardware_type);
            arp.set_protocol_type(self.protocol_type);
            arp.set_hw_addr_len(self.hw_addr_len);
            arp.set_proto_addr_len(self.proto_addr_len);
            arp.set_operation(pnet::packet::arp::ArpOperation::new(self.operation));
            arp.set_sender_hw_addr(self.sender_hw_addr);
            arp.set_sender_proto_addr(self.sender_proto_addr);
            arp.set_target_hw_addr(self.target_hw_addr);
            arp.set_target_proto_addr(self.target_proto_addr);
        }
        if let Some(mut ethernet) = MutableEthernetPacket::new(&mut buffer[..]) {
            ethernet.set_destination(self.destination);
            ethernet.set_source(self.source);
            ethernet.set_ethertype(EtherTypes::Arp);
        }
        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidAddressError> {
        if bytes.len() != FRAME_LEN {
            return Err(InvalidAddressError::FrameLength(bytes.len()));
        }
        let ethernet =
            EthernetPacket::new(bytes).ok_or(InvalidAddressError::FrameLength(bytes.len()))?;
        let arp = ArpPacket::new(ethernet.payload())
            .ok_or(InvalidAddressError::FrameLength(bytes.len()))?;
        Ok(Self {
            destination: ethernet.get_destination(),
            source: ethernet.get_source(),
            hardware_type: arp.get_hardware_type(),
            protocol_type: arp.get_protocol_type(),
            hw_addr_len: arp.get_hw_addr_len(),
            proto_addr_len: arp.get_proto_addr_len(),
            operation: arp.get_operation().0,
            sender_hw_addr: arp.get_sender_hw_addr(),
            sender_proto_addr: arp.get_sender_proto_addr(),
            target_hw_addr: arp.get_target_hw_addr(),
            target_proto_addr: arp.get_target_proto_addr(),
        })
    }
}

pub fn parse_mac(s: &str) -> Result<MacAddr, InvalidAddressError> {
    s.trim()
        .parse()
        .map_err(|_| InvalidAddressError::Mac(s.to_string()))
}

pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, InvalidAddressError> {
    s.trim()
        .parse()
        .map_err(|_| InvalidAddressError::Ipv4(s.to_string()))
}

/// Builds a frame from textual addresses, `aa:bb:cc:dd:ee:ff` and dotted quads.
pub fn build_frame(
    interface_mac: &str,
    sender_ip: &str,
    operation: ArpOperation,
    target_mac: &str,
    target_ip: &str,
) -> Result<EthernetArpFrame, InvalidAddressError> {
    Ok(EthernetArpFrame::new(
        parse_mac(interface_mac)?,
        parse_ipv4(sender_ip)?,
        operation,
        parse_mac(target_mac)?,
        parse_ipv4(target_ip)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: &str = "aa:bb:cc:dd:ee:ff";
    const BROADCAST_MAC: &str = "ff:ff:ff:ff:ff:ff";

    #[test]
    fn test_request_layout() {
        let frame = build_frame(MAC, "192.168.1.10", ArpOperation::Request, BROADCAST_MAC, "192.168.1.10")
            .unwrap()
            .to_bytes();
        let expected: [u8; FRAME_LEN] = [
            // ethernet
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x08, 0x06,
            // arp header
            0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01,
            // sender
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 192, 168, 1, 10,
            // target
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 192, 168, 1, 10,
        ];
        assert_eq!(frame, expected);
        assert_eq!(frame.len(), 42);
    }

    #[test]
    fn test_decode_returns_supplied_fields() {
        let built = build_frame(
            "02:42:ac:11:00:02",
            "172.17.0.2",
            ArpOperation::Reply,
            "01:02:03:04:05:06",
            "172.17.255.255",
        )
        .unwrap();
        let decoded = EthernetArpFrame::from_bytes(&built.to_bytes()).unwrap();
        assert_eq!(decoded, built);
        assert_eq!(decoded.arp_operation(), Some(ArpOperation::Reply));
        assert_eq!(decoded.sender_hw_addr, MacAddr(0x02, 0x42, 0xac, 0x11, 0x00, 0x02));
        assert_eq!(decoded.sender_proto_addr, Ipv4Addr::new(172, 17, 0, 2));
        assert_eq!(decoded.target_hw_addr, MacAddr(1, 2, 3, 4, 5, 6));
        assert_eq!(decoded.target_proto_addr, Ipv4Addr::new(172, 17, 255, 255));
        assert_eq!(decoded.destination, MacAddr::broadcast());
    }

    #[test]
    fn test_operation_only_changes_operation_field() {
        let mac = parse_mac(MAC).unwrap();
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        let request = EthernetArpFrame::announcement(mac, ip, ArpOperation::Request, ip).to_bytes();
        let reply = EthernetArpFrame::announcement(mac, ip, ArpOperation::Reply, ip).to_bytes();

        let differing: Vec<usize> = (0..FRAME_LEN).filter(|&i| request[i] != reply[i]).collect();
        assert_eq!(differing, vec![ARP_OPERATION_OFFSET + 1]);
        assert_eq!(&request[ARP_OPERATION_OFFSET..ARP_OPERATION_OFFSET + 2], &[0, 1]);
        assert_eq!(&reply[ARP_OPERATION_OFFSET..ARP_OPERATION_OFFSET + 2], &[0, 2]);
    }

    #[test]
    fn test_named_offsets() {
        let mac = MacAddr(1, 2, 3, 4, 5, 6);
        let frame = EthernetArpFrame::announcement(
            mac,
            Ipv4Addr::new(10, 0, 0, 1),
            ArpOperation::Reply,
            Ipv4Addr::new(10, 0, 0, 255),
        )
        .to_bytes();
        assert_eq!(&frame[ETHERTYPE_OFFSET..ETHERTYPE_OFFSET + 2], &[0x08, 0x06]);
        assert_eq!(&frame[ARP_SENDER_HW_OFFSET..ARP_SENDER_PROTO_OFFSET], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&frame[ARP_SENDER_PROTO_OFFSET..ARP_TARGET_HW_OFFSET], &[10, 0, 0, 1]);
        assert_eq!(&frame[ARP_TARGET_HW_OFFSET..ARP_TARGET_PROTO_OFFSET], &[0xff; 6]);
        assert_eq!(&frame[ARP_TARGET_PROTO_OFFSET..FRAME_LEN], &[10, 0, 0, 255]);
    }

    #[test]
    fn test_invalid_addresses() {
        assert_eq!(
            build_frame("aa:bb:cc", "10.0.0.1", ArpOperation::Request, BROADCAST_MAC, "10.0.0.1"),
            Err(InvalidAddressError::Mac("aa:bb:cc".to_string()))
        );
        assert_eq!(
            build_frame(MAC, "10.0.0.256", ArpOperation::Request, BROADCAST_MAC, "10.0.0.1"),
            Err(InvalidAddressError::Ipv4("10.0.0.256".to_string()))
        );
        assert_eq!(
            build_frame(MAC, "10.0.0.1", ArpOperation::Reply, "not-a-mac", "10.0.0.1"),
            Err(InvalidAddressError::Mac("not-a-mac".to_string()))
        );
        assert_eq!(
            build_frame(MAC, "10.0.0.1", ArpOperation::Reply, BROADCAST_MAC, "fe80::1"),
            Err(InvalidAddressError::Ipv4("fe80::1".to_string()))
        );
    }

    #[test]
    fn test_from_bytes_rejects_short_frames() {
        assert_eq!(
            EthernetArpFrame::from_bytes(&[0u8; 41]),
            Err(InvalidAddressError::FrameLength(41))
        );
    }
}
