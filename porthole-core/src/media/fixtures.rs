//! Synthetic container fixtures for exercising codec detection.
//!
//! These build structurally valid AVI and MP4 byte streams with an
//! arbitrary codec FourCC. They carry no decodable media; they exist so
//! tests control exactly what the sniffer sees.

/// Where the `moov` metadata box sits relative to the media data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoovPlacement {
    /// moov before mdat, inside the header window
    Front,
    /// moov after an mdat larger than the header window
    End,
}

/// Minimal RIFF/AVI file whose single `vids` stream header declares
/// `codec` as its handler.
pub fn synthetic_avi(codec: &[u8; 4]) -> Vec<u8> {
    let mut strh = Vec::with_capacity(56);
    strh.extend_from_slice(b"vids");
    strh.extend_from_slice(codec);
    strh.resize(56, 0);

    let mut hdrl_children = riff_chunk(b"avih", &[0u8; 56]);
    hdrl_children.extend_from_slice(&riff_list(b"strl", &riff_chunk(b"strh", &strh)));

    let mut body = Vec::new();
    body.extend_from_slice(b"AVI ");
    body.extend_from_slice(&riff_list(b"hdrl", &hdrl_children));
    body.extend_from_slice(&riff_list(b"movi", &[]));

    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Minimal MP4 whose first sample description declares `codec`.
///
/// `MoovPlacement::End` pads `mdat` past the sniffer's header window so
/// only the tail window can see the metadata.
pub fn synthetic_mp4(codec: &[u8; 4], placement: MoovPlacement) -> Vec<u8> {
    synthetic_mp4_with_mdat(
        codec,
        placement,
        match placement {
            MoovPlacement::Front => 64,
            MoovPlacement::End => 48 * 1024,
        },
    )
}

/// As [`synthetic_mp4`], with explicit media payload size.
pub fn synthetic_mp4_with_mdat(
    codec: &[u8; 4],
    placement: MoovPlacement,
    mdat_len: usize,
) -> Vec<u8> {
    let stsd = {
        let mut body = vec![0u8; 4]; // version + flags
        body.extend_from_slice(&1u32.to_be_bytes()); // entry count
        body.extend_from_slice(&mp4_box(codec, &[0u8; 78])); // sample entry
        mp4_box(b"stsd", &body)
    };
    let moov = mp4_box(
        b"moov",
        &mp4_box(
            b"trak",
            &mp4_box(b"mdia", &mp4_box(b"minf", &mp4_box(b"stbl", &stsd))),
        ),
    );

    let mut ftyp_body = Vec::with_capacity(16);
    ftyp_body.extend_from_slice(b"isom");
    ftyp_body.extend_from_slice(&0u32.to_be_bytes());
    ftyp_body.extend_from_slice(b"isom");
    ftyp_body.extend_from_slice(b"mp41");
    let ftyp = mp4_box(b"ftyp", &ftyp_body);

    let mdat = mp4_box(b"mdat", &vec![0u8; mdat_len]);

    let mut out = ftyp;
    match placement {
        MoovPlacement::Front => {
            out.extend_from_slice(&moov);
            out.extend_from_slice(&mdat);
        }
        MoovPlacement::End => {
            out.extend_from_slice(&mdat);
            out.extend_from_slice(&moov);
        }
    }
    out
}

fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

fn riff_chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len() + 1);
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0); // RIFF pads chunks to even boundaries
    }
    out
}

fn riff_list(kind: &[u8; 4], children: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + children.len());
    body.extend_from_slice(kind);
    body.extend_from_slice(children);
    riff_chunk(b"LIST", &body)
}
