//! End-to-end scenarios driven over an in-memory [`LoopbackRelay`]: a hand
//! scripted peer plays the access concentrator's side of discovery, LCP,
//! PAP/CHAP, and IPCP/IPv6CP while `zouppp::session::run_session` drives the
//! real client stack. S1 is the PAP/IPv4 happy path; S3-S5 cover the
//! supervisor's failure paths (wrong-password CHAP, an LCP auth mismatch, and
//! a dual-stack client against an IPv6-only server).

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use zpkt::ether::EtherAddr;
use zpkt::ppp::chap::{ChapCode, ChapPacket, CHAP_HEADER_LEN};
use zpkt::ppp::control::{Control, ControlCode, CONTROL_HEADER_LEN, CONTROL_HEADER_TEMPLATE};
use zpkt::ppp::options::{ControlOptionIter, IpcpOptionType, LcpOptionType};
use zpkt::ppp::pap::{PapCode, PapPacket, PAP_HEADER_LEN};
use zpkt::ppp::{PppFrame, PppProtocol, PPP_FRAME_HEADER_LEN, PPP_FRAME_HEADER_TEMPLATE};
use zpkt::pppoe::{
    PppoeCode, PppoeDiscovery, PppoeSession, PPPOE_DISCOVERY_HEADER_TEMPLATE, PPPOE_SESSION_HEADER_TEMPLATE,
};
use zpkt::{Buf, Cursor, CursorMut, PktBufMut};

use zouppp::config::AuthProto;
use zouppp::datapath::LoggingDatapath;
use zouppp::relay::{LoopbackRelay, PacketRelay};
use zouppp::session::{run_session, Outcome, SessionConfig};

const ETHERTYPE_PPPOE_DISCOVERY: u16 = 0x8863;
const ETHERTYPE_PPPOE_SESSION: u16 = 0x8864;
const SESSION_ID: u16 = 42;

fn build_discovery(code: PppoeCode, session_id: u16) -> Vec<u8> {
    let total = 6;
    let mut bytes = vec![0u8; total];
    let mut buf = CursorMut::new(&mut bytes[..]);
    buf.advance(total);
    let mut pkt = PppoeDiscovery::prepend_header(buf, &PPPOE_DISCOVERY_HEADER_TEMPLATE);
    pkt.set_code(code);
    pkt.set_session_id(session_id);
    bytes
}

fn wire_options(opts: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (ty, value) in opts {
        body.push(*ty);
        body.push((value.len() + 2) as u8);
        body.extend_from_slice(value);
    }
    body
}

fn control_packet(code: ControlCode, identifier: u8, body: &[u8]) -> Vec<u8> {
    let total = CONTROL_HEADER_LEN + body.len();
    let mut bytes = vec![0u8; total];
    let mut buf = CursorMut::new(&mut bytes[..]);
    buf.advance(total);
    buf.chunk_mut()[..body.len()].copy_from_slice(body);
    let mut pkt = Control::prepend_header(buf, &CONTROL_HEADER_TEMPLATE);
    pkt.set_code(code);
    pkt.set_identifier(identifier);
    bytes
}

fn ppp_frame(protocol: PppProtocol, payload: &[u8]) -> Vec<u8> {
    let total = PPP_FRAME_HEADER_LEN + payload.len();
    let mut bytes = vec![0u8; total];
    let mut buf = CursorMut::new(&mut bytes[..]);
    buf.advance(total);
    buf.chunk_mut()[..payload.len()].copy_from_slice(payload);
    let mut frame = PppFrame::prepend_header(buf, &PPP_FRAME_HEADER_TEMPLATE);
    frame.set_protocol(protocol);
    bytes
}

fn pppoe_session_frame(payload: &[u8]) -> Vec<u8> {
    let total = 6 + payload.len();
    let mut bytes = vec![0u8; total];
    let mut buf = CursorMut::new(&mut bytes[..]);
    buf.advance(total);
    buf.chunk_mut()[..payload.len()].copy_from_slice(payload);
    let mut pkt = PppoeSession::prepend_header(buf, &PPPOE_SESSION_HEADER_TEMPLATE);
    pkt.set_code(PppoeCode::SESSION);
    pkt.set_session_id(SESSION_ID);
    bytes
}

/// Parse an inbound PPPoE session frame's PPP payload back into (protocol, body).
async fn recv_ppp(peer: &LoopbackRelay) -> (PppProtocol, Vec<u8>) {
    loop {
        let frame = peer.read(Duration::from_secs(2)).await.expect("peer read");
        if frame.ethertype != ETHERTYPE_PPPOE_SESSION {
            continue;
        }
        let pkt = PppoeSession::parse(Cursor::new(&frame.payload[..])).expect("session frame");
        let ppp = PppFrame::parse(pkt.payload()).expect("ppp frame");
        return (ppp.protocol(), ppp.payload().chunk().to_vec());
    }
}

async fn send_ppp(peer: &LoopbackRelay, client_mac: EtherAddr, protocol: PppProtocol, body: &[u8]) {
    let framed = ppp_frame(protocol, body);
    peer.write(&pppoe_session_frame(&framed), ETHERTYPE_PPPOE_SESSION, client_mac)
        .await
        .expect("peer write");
}

fn parse_options(body: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let pkt = Control::parse(Cursor::new(body)).expect("control packet");
    ControlOptionIter::from_body_slice(pkt.body_slice())
        .map(|o| (o.option_type(), o.value_slice().to_vec()))
        .collect()
}

/// Run one LCP Configure-Request/Ack exchange in both directions, arriving at
/// Opened with the client requiring `auth` and the peer proposing it.
async fn drive_lcp(peer: &LoopbackRelay, client_mac: EtherAddr, auth: &[u8]) {
    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::LCP);
    let pkt = Control::parse(Cursor::new(&body[..])).expect("lcp control");
    assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
    let client_id = pkt.identifier();
    let client_opts = parse_options(&body);

    let ack = control_packet(ControlCode::CONFIGURE_ACK, client_id, &wire_options(&client_opts));
    send_ppp(peer, client_mac, PppProtocol::LCP, &ack).await;

    let our_req_body = wire_options(&[(u8::from(LcpOptionType::AUTH_PROTOCOL), auth.to_vec())]);
    let our_req = control_packet(ControlCode::CONFIGURE_REQUEST, 200, &our_req_body);
    send_ppp(peer, client_mac, PppProtocol::LCP, &our_req).await;

    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::LCP);
    let pkt = Control::parse(Cursor::new(&body[..])).expect("lcp reply");
    assert_eq!(pkt.code(), ControlCode::CONFIGURE_ACK, "client must accept our advertised auth protocol");
    assert_eq!(pkt.identifier(), 200);
}

async fn drive_pap(peer: &LoopbackRelay, client_mac: EtherAddr, expect_user: &str, expect_pass: &str) {
    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::PAP);
    let req = PapPacket::parse(Cursor::new(&body[..])).expect("pap request");
    assert_eq!(req.peer_id(), expect_user.as_bytes());
    assert_eq!(req.passwd(), expect_pass.as_bytes());

    let total = PAP_HEADER_LEN + 1;
    let mut bytes = vec![0u8; total];
    let buf = CursorMut::new(&mut bytes[..]);
    PapPacket::build_reply(buf, PapCode::AUTH_ACK, req.identifier(), b"");
    send_ppp(peer, client_mac, PppProtocol::PAP, &bytes).await;
}

/// Drive IPCP to Opened, Naking the client's initial 0.0.0.0 proposal with
/// `assigned`, then Acking the resend and Acking our own empty request.
async fn drive_ipcp(peer: &LoopbackRelay, client_mac: EtherAddr, assigned: Ipv4Addr) {
    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::IPCP);
    let pkt = Control::parse(Cursor::new(&body[..])).expect("ipcp control");
    assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
    let first_id = pkt.identifier();
    let first_opts = parse_options(&body);
    assert_eq!(first_opts[0].0, u8::from(IpcpOptionType::IP_ADDRESS));
    assert_eq!(first_opts[0].1, vec![0, 0, 0, 0]);

    let nak_body = wire_options(&[(u8::from(IpcpOptionType::IP_ADDRESS), assigned.octets().to_vec())]);
    let nak = control_packet(ControlCode::CONFIGURE_NAK, first_id, &nak_body);
    send_ppp(peer, client_mac, PppProtocol::IPCP, &nak).await;

    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::IPCP);
    let pkt = Control::parse(Cursor::new(&body[..])).expect("ipcp control retry");
    assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
    let second_id = pkt.identifier();
    let second_opts = parse_options(&body);
    assert_eq!(second_opts[0].1, assigned.octets().to_vec());

    let ack = control_packet(ControlCode::CONFIGURE_ACK, second_id, &wire_options(&second_opts));
    send_ppp(peer, client_mac, PppProtocol::IPCP, &ack).await;

    let our_req = control_packet(ControlCode::CONFIGURE_REQUEST, 210, &[]);
    send_ppp(peer, client_mac, PppProtocol::IPCP, &our_req).await;

    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::IPCP);
    let pkt = Control::parse(Cursor::new(&body[..])).expect("ipcp final ack");
    assert_eq!(pkt.code(), ControlCode::CONFIGURE_ACK);
    assert_eq!(pkt.identifier(), 210);
}

#[tokio::test]
async fn s1_pap_ipv4_happy_path() {
    let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
    let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
    let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);
    let assigned = Ipv4Addr::new(192, 0, 2, 2);

    let bras = tokio::spawn(async move {
        let padi = peer.read(Duration::from_secs(2)).await.expect("padi");
        assert_eq!(padi.ethertype, ETHERTYPE_PPPOE_DISCOVERY);
        peer.write(&build_discovery(PppoeCode::PADO, 0), ETHERTYPE_PPPOE_DISCOVERY, client_mac)
            .await
            .unwrap();

        let _padr = peer.read(Duration::from_secs(2)).await.expect("padr");
        peer.write(
            &build_discovery(PppoeCode::PADS, SESSION_ID),
            ETHERTYPE_PPPOE_DISCOVERY,
            client_mac,
        )
        .await
        .unwrap();

        drive_lcp(&peer, client_mac, &[0xc0, 0x23]).await;
        drive_pap(&peer, client_mac, "alice", "secret").await;
        drive_ipcp(&peer, client_mac, assigned).await;

        peer
    });

    let cfg = SessionConfig {
        client_index: 0,
        service_name: String::new(),
        cid: String::new(),
        rid: String::new(),
        auth_proto: AuthProto::Pap,
        username: "alice".into(),
        password: "secret".into(),
        ipv4: true,
        ipv6: false,
        ifname: "ppp0".into(),
        retry: 3,
        timeout: Duration::from_secs(2),
    };

    let result = run_session(
        Arc::new(client),
        cfg,
        Arc::new(LoggingDatapath),
        CancellationToken::new(),
    )
    .await;

    match result.outcome {
        Outcome::Success { ipv4, ipv6_ifid } => {
            assert_eq!(ipv4, Some(assigned));
            assert_eq!(ipv6_ifid, None);
        }
        Outcome::Failure { reason } => panic!("expected success, got failure: {reason}"),
    }
    assert!(result.finished_at >= result.started_at);

    bras.await.expect("bras task");
}

/// Challenge the client, collect its response, and fail the exchange — the
/// peer's verdict on the password, not anything this helper checks itself.
async fn drive_chap_failure(peer: &LoopbackRelay, client_mac: EtherAddr) {
    let identifier = 9u8;
    let challenge = [0xaa; 8];
    let total = CHAP_HEADER_LEN + 1 + challenge.len() + b"bras".len();
    let mut bytes = vec![0u8; total];
    {
        let buf = CursorMut::new(&mut bytes[..]);
        ChapPacket::build_challenge_or_response(buf, ChapCode::CHALLENGE, identifier, &challenge, b"bras");
    }
    send_ppp(peer, client_mac, PppProtocol::CHAP, &bytes).await;

    let (protocol, body) = recv_ppp(peer).await;
    assert_eq!(protocol, PppProtocol::CHAP);
    let resp = ChapPacket::parse(Cursor::new(&body[..])).expect("chap response");
    assert_eq!(resp.code(), ChapCode::RESPONSE);
    assert_eq!(resp.identifier(), identifier);

    let message = b"Authentication failed";
    let total = CHAP_HEADER_LEN + message.len();
    let mut failure = vec![0u8; total];
    {
        let buf = CursorMut::new(&mut failure[..]);
        ChapPacket::build_status(buf, ChapCode::FAILURE, identifier, message);
    }
    send_ppp(peer, client_mac, PppProtocol::CHAP, &failure).await;
}

#[tokio::test]
async fn s3_chap_wrong_password_fails_without_opening_any_ncp() {
    let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
    let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
    let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);

    let bras = tokio::spawn(async move {
        let padi = peer.read(Duration::from_secs(2)).await.expect("padi");
        assert_eq!(padi.ethertype, ETHERTYPE_PPPOE_DISCOVERY);
        peer.write(&build_discovery(PppoeCode::PADO, 0), ETHERTYPE_PPPOE_DISCOVERY, client_mac)
            .await
            .unwrap();

        let _padr = peer.read(Duration::from_secs(2)).await.expect("padr");
        peer.write(
            &build_discovery(PppoeCode::PADS, SESSION_ID),
            ETHERTYPE_PPPOE_DISCOVERY,
            client_mac,
        )
        .await
        .unwrap();

        drive_lcp(&peer, client_mac, &[0xc2, 0x23, 0x05]).await;
        drive_chap_failure(&peer, client_mac).await;

        peer
    });

    let cfg = SessionConfig {
        client_index: 0,
        service_name: String::new(),
        cid: String::new(),
        rid: String::new(),
        auth_proto: AuthProto::Chap,
        username: "alice".into(),
        password: "wrong".into(),
        ipv4: true,
        ipv6: false,
        ifname: "ppp0".into(),
        retry: 3,
        timeout: Duration::from_secs(2),
    };

    let result = run_session(
        Arc::new(client),
        cfg,
        Arc::new(LoggingDatapath),
        CancellationToken::new(),
    )
    .await;

    match result.outcome {
        Outcome::Failure { reason } => assert!(reason.contains("authentication"), "unexpected reason: {reason}"),
        Outcome::Success { .. } => panic!("expected a CHAP failure to fail the session"),
    }

    bras.await.expect("bras task");
}

#[tokio::test(start_paused = true)]
async fn s4_auth_mismatch_lcp_never_opens() {
    let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
    let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
    let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);

    let bras = tokio::spawn(async move {
        let padi = peer.read(Duration::from_secs(2)).await.expect("padi");
        assert_eq!(padi.ethertype, ETHERTYPE_PPPOE_DISCOVERY);
        peer.write(&build_discovery(PppoeCode::PADO, 0), ETHERTYPE_PPPOE_DISCOVERY, client_mac)
            .await
            .unwrap();

        let _padr = peer.read(Duration::from_secs(2)).await.expect("padr");
        peer.write(
            &build_discovery(PppoeCode::PADS, SESSION_ID),
            ETHERTYPE_PPPOE_DISCOVERY,
            client_mac,
        )
        .await
        .unwrap();

        // Ack the client's MRU/Magic-Number proposal so it reaches AckRcvd...
        let (protocol, body) = recv_ppp(&peer).await;
        assert_eq!(protocol, PppProtocol::LCP);
        let pkt = Control::parse(Cursor::new(&body[..])).expect("lcp control");
        assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
        let client_id = pkt.identifier();
        let client_opts = parse_options(&body);
        let ack = control_packet(ControlCode::CONFIGURE_ACK, client_id, &wire_options(&client_opts));
        send_ppp(&peer, client_mac, PppProtocol::LCP, &ack).await;

        // ...then stubbornly insist on PAP, which the client (requiring CHAP)
        // can only Nak. The peer never relents, so LCP can never open.
        let pap_req_body = wire_options(&[(u8::from(LcpOptionType::AUTH_PROTOCOL), vec![0xc0, 0x23])]);
        let pap_req = control_packet(ControlCode::CONFIGURE_REQUEST, 50, &pap_req_body);
        send_ppp(&peer, client_mac, PppProtocol::LCP, &pap_req).await;

        let (protocol, body) = recv_ppp(&peer).await;
        assert_eq!(protocol, PppProtocol::LCP);
        let pkt = Control::parse(Cursor::new(&body[..])).expect("lcp nak");
        assert_eq!(pkt.code(), ControlCode::CONFIGURE_NAK);
        assert_eq!(pkt.identifier(), 50);
        let nak_opts = parse_options(&body);
        assert_eq!(nak_opts[0].1, vec![0xc2, 0x23, 0x05]);

        peer
    });

    let cfg = SessionConfig {
        client_index: 0,
        service_name: String::new(),
        cid: String::new(),
        rid: String::new(),
        auth_proto: AuthProto::Chap,
        username: "alice".into(),
        password: "secret".into(),
        ipv4: true,
        ipv6: false,
        ifname: "ppp0".into(),
        retry: 2,
        timeout: Duration::from_secs(2),
    };

    let result = run_session(
        Arc::new(client),
        cfg,
        Arc::new(LoggingDatapath),
        CancellationToken::new(),
    )
    .await;

    match result.outcome {
        Outcome::Failure { reason } => assert!(reason.contains("LCP"), "unexpected failure reason: {reason}"),
        Outcome::Success { .. } => panic!("expected LCP to never open on an auth mismatch"),
    }

    bras.await.expect("bras task");
}

/// Drive IPCP and IPv6CP concurrently: IPCP's only option gets Configure-
/// Rejected and then the peer goes silent (so it eventually times out to
/// Stopped), while IPv6CP negotiates normally to Opened. Messages from the
/// two protocols can interleave in either order, so this tracks each one's
/// progress independently rather than assuming a fixed sequence.
async fn drive_mixed_ncp(peer: &LoopbackRelay, client_mac: EtherAddr) {
    let mut ipcp_stage = 0u8;
    let mut ipv6cp_stage = 0u8;

    while ipcp_stage < 2 || ipv6cp_stage < 2 {
        let (protocol, body) = recv_ppp(peer).await;
        match protocol {
            PppProtocol::IPCP => {
                let pkt = Control::parse(Cursor::new(&body[..])).expect("ipcp control");
                assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
                match ipcp_stage {
                    0 => {
                        let opts = parse_options(&body);
                        assert_eq!(opts.len(), 1);
                        assert_eq!(opts[0].0, u8::from(IpcpOptionType::IP_ADDRESS));
                        let reject =
                            control_packet(ControlCode::CONFIGURE_REJECT, pkt.identifier(), &wire_options(&opts));
                        send_ppp(peer, client_mac, PppProtocol::IPCP, &reject).await;
                        ipcp_stage = 1;
                    }
                    1 => {
                        let opts = parse_options(&body);
                        assert!(opts.is_empty(), "client should have withdrawn its rejected option");
                        // Go silent: with nothing left to offer, IPCP must stall
                        // and eventually time out to Stopped.
                        ipcp_stage = 2;
                    }
                    _ => panic!("unexpected extra IPCP Configure-Request"),
                }
            }
            PppProtocol::IPV6CP => {
                let pkt = Control::parse(Cursor::new(&body[..])).expect("ipv6cp control");
                match ipv6cp_stage {
                    0 => {
                        assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
                        let opts = parse_options(&body);
                        let ack = control_packet(ControlCode::CONFIGURE_ACK, pkt.identifier(), &wire_options(&opts));
                        send_ppp(peer, client_mac, PppProtocol::IPV6CP, &ack).await;
                        let our_req = control_packet(ControlCode::CONFIGURE_REQUEST, 220, &[]);
                        send_ppp(peer, client_mac, PppProtocol::IPV6CP, &our_req).await;
                        ipv6cp_stage = 1;
                    }
                    1 => {
                        assert_eq!(pkt.code(), ControlCode::CONFIGURE_ACK);
                        assert_eq!(pkt.identifier(), 220);
                        ipv6cp_stage = 2;
                    }
                    _ => panic!("unexpected extra IPv6CP packet"),
                }
            }
            other => panic!("unexpected protocol {other:?} during NCP negotiation"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn s5_ipv6_only_server_fails_dualstack_client_on_ipcp_timeout() {
    let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
    let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
    let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);

    let bras = tokio::spawn(async move {
        let padi = peer.read(Duration::from_secs(2)).await.expect("padi");
        assert_eq!(padi.ethertype, ETHERTYPE_PPPOE_DISCOVERY);
        peer.write(&build_discovery(PppoeCode::PADO, 0), ETHERTYPE_PPPOE_DISCOVERY, client_mac)
            .await
            .unwrap();

        let _padr = peer.read(Duration::from_secs(2)).await.expect("padr");
        peer.write(
            &build_discovery(PppoeCode::PADS, SESSION_ID),
            ETHERTYPE_PPPOE_DISCOVERY,
            client_mac,
        )
        .await
        .unwrap();

        drive_lcp(&peer, client_mac, &[0xc0, 0x23]).await;
        drive_pap(&peer, client_mac, "alice", "secret").await;
        drive_mixed_ncp(&peer, client_mac).await;

        peer
    });

    let cfg = SessionConfig {
        client_index: 0,
        service_name: String::new(),
        cid: String::new(),
        rid: String::new(),
        auth_proto: AuthProto::Pap,
        username: "alice".into(),
        password: "secret".into(),
        ipv4: true,
        ipv6: true,
        ifname: "ppp0".into(),
        retry: 2,
        timeout: Duration::from_secs(2),
    };

    let result = run_session(
        Arc::new(client),
        cfg,
        Arc::new(LoggingDatapath),
        CancellationToken::new(),
    )
    .await;

    match result.outcome {
        Outcome::Failure { reason } => assert!(reason.contains("IPCP"), "unexpected failure reason: {reason}"),
        Outcome::Success { .. } => panic!("expected IPCP to time out when the server never offers an address"),
    }

    bras.await.expect("bras task");
}
