use crate::dmx::UNIVERSE_SIZE;

pub const DMX_DATA_OFFSET: usize = 18;
pub const PACKET_SIZE: usize = DMX_DATA_OFFSET + UNIVERSE_SIZE;

const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const OPCODE_OUTPUT: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 0x000e;

/// Encodes one ArtDmx (OpOutput) packet into `out`.
///
/// Header layout: id, opcode little-endian, protocol version big-endian,
/// sequence, physical 0, port-address split into sub-uni low / net high,
/// length 512 big-endian, then the frame bytes. 530 bytes total.
pub fn encode(universe: u16, sequence: u8, frame: &[u8; UNIVERSE_SIZE], out: &mut [u8; PACKET_SIZE]) {
    out[0..8].copy_from_slice(ARTNET_ID);
    out[8] = (OPCODE_OUTPUT & 0xff) as u8;
    out[9] = (OPCODE_OUTPUT >> 8) as u8;
    out[10] = (PROTOCOL_VERSION >> 8) as u8;
    out[11] = (PROTOCOL_VERSION & 0xff) as u8;
    out[12] = sequence;
    out[13] = 0x00; // Physical
    out[14] = (universe & 0xff) as u8; // Sub-uni
    out[15] = (universe >> 8) as u8; // Net
    out[16] = (UNIVERSE_SIZE >> 8) as u8;
    out[17] = (UNIVERSE_SIZE & 0xff) as u8;
    out[DMX_DATA_OFFSET..].copy_from_slice(frame);
}

#[cfg(test)]
mod test_packet {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut frame = [0u8; UNIVERSE_SIZE];
        frame[0] = 255;
        frame[1] = 128;
        frame[2] = 64;

        let mut out = [0xaau8; PACKET_SIZE];
        encode(0, 1, &frame, &mut out);

        assert_eq!(
            &out[0..DMX_DATA_OFFSET],
            &[
                b'A', b'r', b't', b'-', b'N', b'e', b't', 0x00, // id
                0x00, 0x50, // OpOutput, little-endian
                0x00, 0x0e, // protocol version, big-endian
                0x01, // sequence
                0x00, // physical
                0x00, 0x00, // sub-uni, net
                0x02, 0x00, // length 512, big-endian
            ]
        );
        assert_eq!(&out[DMX_DATA_OFFSET..DMX_DATA_OFFSET + 3], &[255, 128, 64]);
        assert!(out[DMX_DATA_OFFSET + 3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_universe_split() {
        let frame = [0u8; UNIVERSE_SIZE];
        let mut out = [0u8; PACKET_SIZE];

        encode(0x1234, 9, &frame, &mut out);
        assert_eq!(out[12], 9);
        assert_eq!(out[14], 0x34);
        assert_eq!(out[15], 0x12);
    }
}
