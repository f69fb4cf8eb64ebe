//! End-to-end pipeline tests over synthetic in-memory captures.

use flowvec::{feature_names, process_capture, process_captures, FlowConfig};

const CLIENT: [u8; 4] = [192, 168, 0, 5];
const SERVER: [u8; 4] = [10, 1, 1, 1];

fn global_header_be() -> Vec<u8> {
    let mut buf = vec![0xA1, 0xB2, 0xC3, 0xD4];
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&[0, 0, 0, 1]); // Ethernet
    buf
}

fn record_be(timestamp_us: u64, frame: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&((timestamp_us / 1_000_000) as u32).to_be_bytes());
    buf.extend_from_slice(&((timestamp_us % 1_000_000) as u32).to_be_bytes());
    buf.extend_from_slice(&(frame.len() as u32).to_be_bytes());
    buf.extend_from_slice(&(frame.len() as u32).to_be_bytes());
    buf.extend_from_slice(frame);
    buf
}

fn tcp_frame(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    flags: u8,
    window: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut frame = vec![0u8; 12];
    frame.extend_from_slice(&[0x08, 0x00]);

    let mut ip = vec![0u8; 20];
    ip[0] = 0x45;
    let total_len = (20 + 20 + payload.len()) as u16;
    ip[2..4].copy_from_slice(&total_len.to_be_bytes());
    ip[9] = 6; // TCP
    ip[12..16].copy_from_slice(&src);
    ip[16..20].copy_from_slice(&dst);
    frame.extend_from_slice(&ip);

    let mut tcp = vec![0u8; 20];
    tcp[0..2].copy_from_slice(&src_port.to_be_bytes());
    tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
    tcp[12] = 0x50;
    tcp[13] = flags;
    tcp[14..16].copy_from_slice(&window.to_be_bytes());
    frame.extend_from_slice(&tcp);
    frame.extend_from_slice(payload);
    frame
}

/// Forward SYN at t=0, backward SYN/ACK at t=100ms, forward ACK with
/// payload at t=250ms, plus two junk frames the decoder must skip.
fn three_packet_capture() -> Vec<u8> {
    let mut data = global_header_be();
    data.extend(record_be(
        0,
        &tcp_frame(CLIENT, SERVER, 50000, 443, 0x02, 1000, &[]),
    ));

    // An ARP frame and a truncated runt, neither of which may abort the run.
    let mut arp = vec![0u8; 12];
    arp.extend_from_slice(&[0x08, 0x06]);
    arp.extend_from_slice(&[0u8; 28]);
    data.extend(record_be(50_000, &arp));
    data.extend(record_be(60_000, &[0u8; 10]));

    data.extend(record_be(
        100_000,
        &tcp_frame(SERVER, CLIENT, 443, 50000, 0x12, 2000, &[]),
    ));
    data.extend(record_be(
        250_000,
        &tcp_frame(CLIENT, SERVER, 50000, 443, 0x10, 500, b"GET /"),
    ));
    data
}

fn col(names: &[String], name: &str) -> usize {
    names
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("no column named {name}"))
}

#[test]
fn pipeline_produces_expected_feature_row() {
    let record = process_capture(&three_packet_capture(), &FlowConfig::default())
        .unwrap()
        .expect("session should produce a row");

    let names = feature_names();
    let row = record.features.to_row();
    assert_eq!(row.len(), names.len() - 1); // label is appended externally

    assert_eq!(row[col(&names, "Src Port")], 50000.0);
    assert_eq!(row[col(&names, "Dst Port")], 443.0);
    assert_eq!(row[col(&names, "Protocol")], 6.0);
    assert_eq!(row[col(&names, "Flow Duration(s)")], 0.25);
    assert_eq!(row[col(&names, "Fwd Pkt Num")], 2.0);
    assert_eq!(row[col(&names, "Bwd Pkt Num")], 1.0);
    assert_eq!(row[col(&names, "Fwd Head Byte Mean")], 20.0);
    assert_eq!(row[col(&names, "Fwd Init Win Bytes")], 1000.0);
    assert_eq!(row[col(&names, "Bwd Init Win Bytes")], 2000.0);
    assert_eq!(row[col(&names, "SYN Count")], 2.0);
    assert_eq!(row[col(&names, "ACK Count")], 2.0);
    assert_eq!(row[col(&names, "Flow Pld Byte Sum")], 5.0);
    assert_eq!(row[col(&names, "Fwd Pkts/s")], 8.0);
    // Gaps below the 1s subflow timeout: normalized features stay zero.
    assert_eq!(row[col(&names, "Sub Flow Fwd Pkts")], 0.0);
    // Flow IAT after the position-0 discard: [100ms, 150ms].
    assert_eq!(row[col(&names, "Flow IAT Max")], 150.0);
    assert_eq!(row[col(&names, "Flow IAT Min")], 100.0);
    // The 40- and 45-byte forward packets both land in length bucket 1.
    assert_eq!(row[col(&names, "FwdIPlen1")], 2.0);
    assert_eq!(row[col(&names, "BwdIPlen1")], 1.0);
    assert_eq!(row[col(&names, "FwdIPlen0")], 0.0);
}

#[test]
fn payload_matrix_is_fixed_shape_and_padded() {
    let record = process_capture(&three_packet_capture(), &FlowConfig::default())
        .unwrap()
        .unwrap();

    assert_eq!(record.payloads.dim(), (16, 128));
    // First two packets had no payload, the third carried "GET /".
    assert!(record.payloads.row(0).iter().all(|b| *b == 0));
    assert!(record.payloads.row(1).iter().all(|b| *b == 0));
    assert_eq!(record.payloads[[2, 0]], b'G');
    assert_eq!(record.payloads[[2, 4]], b'/');
    assert_eq!(record.payloads[[2, 5]], 0);
    for i in 3..16 {
        assert!(record.payloads.row(i).iter().all(|b| *b == 0));
    }
}

#[test]
fn single_instant_capture_yields_no_record() {
    let mut data = global_header_be();
    data.extend(record_be(
        5_000_000,
        &tcp_frame(CLIENT, SERVER, 50000, 443, 0x02, 1000, &[]),
    ));
    data.extend(record_be(
        5_000_000,
        &tcp_frame(SERVER, CLIENT, 443, 50000, 0x12, 2000, &[]),
    ));

    let result = process_capture(&data, &FlowConfig::default()).unwrap();
    assert!(result.is_none());
}

#[test]
fn capture_without_admissible_packets_yields_no_record() {
    let mut data = global_header_be();
    let mut arp = vec![0u8; 12];
    arp.extend_from_slice(&[0x08, 0x06]);
    arp.extend_from_slice(&[0u8; 28]);
    data.extend(record_be(0, &arp));

    let result = process_capture(&data, &FlowConfig::default()).unwrap();
    assert!(result.is_none());
}

#[test]
fn bad_capture_header_is_fatal() {
    assert!(process_capture(b"not a pcap file at all....", &FlowConfig::default()).is_err());
    assert!(process_capture(&[], &FlowConfig::default()).is_err());
}

#[test]
fn batch_runner_preserves_order_and_isolates_failures() {
    let good = three_packet_capture();

    let mut degenerate = global_header_be();
    degenerate.extend(record_be(
        1_000_000,
        &tcp_frame(CLIENT, SERVER, 50000, 443, 0x02, 1000, &[]),
    ));

    let broken = vec![0xDE, 0xAD, 0xBE, 0xEF];

    let captures = vec![good, degenerate, broken];
    let results = process_captures(&captures, &FlowConfig::default(), 2);

    assert_eq!(results.len(), 3);
    assert!(results[0].as_ref().unwrap().is_some());
    assert!(results[1].as_ref().unwrap().is_none());
    assert!(results[2].is_err());
}

#[test]
fn serialized_features_round_trip_field_names() {
    let record = process_capture(&three_packet_capture(), &FlowConfig::default())
        .unwrap()
        .unwrap();

    let json = serde_json::to_value(&record.features).unwrap();
    assert_eq!(json["src_port"], 50000);
    assert_eq!(json["fwd_pkt_num"], 2);
    assert_eq!(json["fwd_len_dist"].as_array().unwrap().len(), 150);
}
