//! SETUP packets
//!
//! A [`SetupPacket`] is the decoded data stage of a SETUP transaction
//! [USB2, 9.3]. The decoder overwrites the whole packet each time it
//! accepts a new SETUP transaction, and pulses [`received`](SetupPacket::received)
//! for exactly one tick. Latch the fields if you need them after that tick.

use usb_device::{
    control::{Recipient, Request, RequestType},
    UsbDirection,
};

/// Size of a SETUP data stage, in bytes.
pub const SETUP_PACKET_LEN: usize = 8;

/// A parsed SETUP packet
///
/// `recipient`, `kind`, and `is_in_request` are the three fields of
/// `bmRequestType`. `value`, `index` and `length` are reassembled from
/// their little-endian wire order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetupPacket {
    /// Pulsed for one tick when this packet was just received.
    pub received: bool,
    /// `bmRequestType[4:0]`. Only the low 5 bits are meaningful.
    pub recipient: u8,
    /// `bmRequestType[6:5]`, the request type. Only the low 2 bits are meaningful.
    pub kind: u8,
    /// `bmRequestType[7]`; set for device-to-host requests.
    pub is_in_request: bool,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
    /// `wLength`
    pub length: u16,
}

impl SetupPacket {
    /// Decompose the 8-byte data stage of a SETUP transaction.
    ///
    /// The returned packet is not marked as [`received`](SetupPacket::received);
    /// only the decoder sets that pulse.
    pub const fn parse(data: &[u8; SETUP_PACKET_LEN]) -> Self {
        let request_type = data[0];
        SetupPacket {
            received: false,
            recipient: request_type & 0b1_1111,
            kind: (request_type >> 5) & 0b11,
            is_in_request: request_type & (1 << 7) != 0,
            request: data[1],
            value: u16::from_le_bytes([data[2], data[3]]),
            index: u16::from_le_bytes([data[4], data[5]]),
            length: u16::from_le_bytes([data[6], data[7]]),
        }
    }

    /// Returns the `bmRequestType` byte.
    pub const fn request_type_bits(&self) -> u8 {
        (self.recipient & 0b1_1111) | ((self.kind & 0b11) << 5) | ((self.is_in_request as u8) << 7)
    }

    /// Produce the 8 bytes that would appear on the wire for this packet.
    pub const fn to_bytes(&self) -> [u8; SETUP_PACKET_LEN] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type_bits(),
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    /// The transfer direction of the data stage.
    pub fn direction(&self) -> UsbDirection {
        if self.is_in_request {
            UsbDirection::In
        } else {
            UsbDirection::Out
        }
    }

    /// The request type, as understood by `usb-device`.
    pub fn request_type(&self) -> RequestType {
        match self.kind & 0b11 {
            0 => RequestType::Standard,
            1 => RequestType::Class,
            2 => RequestType::Vendor,
            _ => RequestType::Reserved,
        }
    }

    /// The request recipient, as understood by `usb-device`.
    ///
    /// All recipients beyond "other" are reserved.
    pub fn recipient(&self) -> Recipient {
        match self.recipient & 0b1_1111 {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            _ => Recipient::Reserved,
        }
    }
}

impl From<SetupPacket> for Request {
    fn from(setup: SetupPacket) -> Self {
        Request {
            direction: setup.direction(),
            request_type: setup.request_type(),
            recipient: setup.recipient(),
            request: setup.request,
            value: setup.value,
            index: setup.index,
            length: setup.length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SetupPacket;
    use usb_device::{
        control::{Recipient, Request, RequestType},
        UsbDirection,
    };

    const VENDOR_OUT: [u8; 8] = [0b0_10_00010, 12, 0xcd, 0xab, 0x23, 0x01, 0x78, 0x56];

    #[test]
    fn parse_vendor_request() {
        let setup = SetupPacket::parse(&VENDOR_OUT);
        assert!(!setup.received);
        assert_eq!(setup.recipient, 0b00010);
        assert_eq!(setup.kind, 0b10);
        assert!(!setup.is_in_request);
        assert_eq!(setup.request, 12);
        assert_eq!(setup.value, 0xabcd);
        assert_eq!(setup.index, 0x0123);
        assert_eq!(setup.length, 0x5678);

        assert_eq!(setup.recipient(), Recipient::Endpoint);
        assert_eq!(setup.request_type(), RequestType::Vendor);
        assert_eq!(setup.direction(), UsbDirection::Out);
    }

    #[test]
    fn request_type_bits() {
        // Every bmRequestType value survives the decomposition.
        for bits in 0..=u8::MAX {
            let setup = SetupPacket::parse(&[bits, 0, 0, 0, 0, 0, 0, 0]);
            assert_eq!(setup.request_type_bits(), bits);
        }
    }

    #[test]
    fn to_bytes() {
        assert_eq!(SetupPacket::parse(&VENDOR_OUT).to_bytes(), VENDOR_OUT);
    }

    #[test]
    fn get_descriptor_request() {
        // GET_DESCRIPTOR(DEVICE), 18 bytes
        let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]);
        let request = Request::from(setup);
        assert_eq!(request.direction, UsbDirection::In);
        assert_eq!(request.request_type, RequestType::Standard);
        assert_eq!(request.recipient, Recipient::Device);
        assert_eq!(request.request, Request::GET_DESCRIPTOR);
        assert_eq!(request.value, 0x0100);
        assert_eq!(request.index, 0);
        assert_eq!(request.length, 18);
    }

    #[test]
    fn reserved_recipient() {
        let setup = SetupPacket::parse(&[0b0_01_11111, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(setup.recipient(), Recipient::Reserved);
        assert_eq!(setup.request_type(), RequestType::Class);
    }
}
