//! Wire-format behavior exercised through the public API only: frame
//! classification boundaries and the fixed-width contract that the three
//! unicast frame kinds never collide in length.

use collectrp::wire::{Beacon, ChildControl, ChildControlKind, CollectHeader, TopologyReport};

#[test]
fn the_three_unicast_frame_kinds_have_pairwise_distinct_lengths() {
    let lengths = [ChildControl::LEN, TopologyReport::LEN, CollectHeader::LEN];
    assert_ne!(lengths[0], lengths[1]);
    assert_ne!(lengths[1], lengths[2]);
    assert_ne!(lengths[0], lengths[2]);
}

#[test]
fn collect_header_decode_accepts_trailing_application_payload() {
    let header = CollectHeader {
        source: collectrp::LinkAddr::new(0, 1),
        dest: collectrp::LinkAddr::new(0, 2),
        hops: 3,
    };
    let mut buf = header.encode().to_vec();
    buf.extend_from_slice(b"application data");

    let (decoded, rest) = CollectHeader::decode(&buf).unwrap();
    assert_eq!(decoded, header);
    assert_eq!(rest, b"application data");
}

#[test]
fn malformed_frames_of_the_wrong_length_fail_to_decode_rather_than_panic() {
    assert!(Beacon::decode(&[0u8; 3]).is_none());
    assert!(ChildControl::decode(&[0u8; 1]).is_none());
    assert!(TopologyReport::decode(&[0u8; 4]).is_none());
}

#[test]
fn child_control_rejects_an_unrecognized_kind_byte() {
    let mut buf = ChildControl { kind: ChildControlKind::Add, child: collectrp::LinkAddr::new(0, 5) }.encode();
    buf[0] = 0x00;
    assert!(ChildControl::decode(&buf).is_none());
}

#[test]
fn topology_report_round_trip_preserves_subtree_order_and_drops_null_padding() {
    let report = TopologyReport {
        node: collectrp::LinkAddr::new(1, 0),
        metric: 4,
        subtree: vec![collectrp::LinkAddr::new(0, 2), collectrp::LinkAddr::new(0, 3)],
    };
    let encoded = report.encode();
    let decoded = TopologyReport::decode(&encoded).unwrap();
    assert_eq!(decoded.subtree, report.subtree);
    assert!(!decoded.subtree.contains(&collectrp::LinkAddr::NULL));
}

#[test]
fn an_oversized_subtree_count_in_the_header_is_clamped_on_decode() {
    let mut encoded = TopologyReport {
        node: collectrp::LinkAddr::new(0, 1),
        metric: 1,
        subtree: vec![],
    }
    .encode();
    // forge a subtree_size field larger than the fixed payload actually holds
    encoded[4..6].copy_from_slice(&u16::MAX.to_le_bytes());
    let decoded = TopologyReport::decode(&encoded).expect("still a valid fixed-length frame");
    assert!(decoded.subtree.len() <= collectrp::config::MAX_SUBTREE_SIZE);
}
