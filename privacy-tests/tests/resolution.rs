use bo_tie_privacy::{BluetoothDeviceAddress, IdentityRecord, ResolutionSession, Step};
use bo_tie_privacy::{CryptoGateway, DeviceType, KeyType, ResolutionState};
use bo_tie_privacy_tests::{
    init_logging, manager, peer_record, resolved_identity, rpa_for, unkeyed_record, LOCAL_IRK,
};
use futures::executor::block_on;
use rand::{Rng, SeedableRng};

#[tokio::test]
async fn generate_then_resolve() {
    init_logging();

    let local = manager(1, Vec::new());

    let address = local.generate_resolvable_private_address().await.unwrap();

    let peer = manager(
        2,
        vec![unkeyed_record(1), peer_record(2, 0x1111), peer_record(3, LOCAL_IRK)],
    );

    let record = peer.resolve_random_address(address).await.unwrap();

    assert_eq!(resolved_identity(3), record.identity_address);

    assert_eq!(2, peer.gateway().encrypt_calls());

    // resolving does not touch the bookkeeping of the record
    assert_eq!(BluetoothDeviceAddress::zeroed(), peer.records()[2].current_random_address);
}

#[test]
fn every_keyed_record_resolves() {
    init_logging();

    let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x5eed);

    let irks: Vec<u128> = (0..8).map(|_| rng.gen()).collect();

    let records: Vec<IdentityRecord> = irks
        .iter()
        .enumerate()
        .map(|(n, irk)| peer_record(n as u8, *irk))
        .collect();

    let peer = manager(3, records);

    for (n, irk) in irks.iter().enumerate() {
        for _ in 0..4 {
            let prand: [u8; 3] = rng.gen();

            let record = block_on(peer.resolve_random_address(rpa_for(*irk, prand)))
                .unwrap_or_else(|| panic!("record {} did not resolve", n));

            assert_eq!(resolved_identity(n as u8), record.identity_address);
        }
    }
}

#[tokio::test]
async fn empty_store_makes_no_encryptions() {
    init_logging();

    let peer = manager(4, Vec::new());

    assert_eq!(None, peer.resolve_random_address(rpa_for(0x42, [1, 2, 3])).await);

    assert_eq!(0, peer.gateway().encrypt_calls());

    assert!(!peer.is_resolving());
}

#[tokio::test]
async fn candidates_without_keys_are_skipped() {
    init_logging();

    let irk = 0x0f1e2d3c_4b5a6978_8796a5b4_c3d2e1f0;

    let peer = manager(5, vec![unkeyed_record(0), unkeyed_record(1), peer_record(2, irk)]);

    let record = peer.resolve_random_address(rpa_for(irk, [0xaa, 0xbb, 0xcc])).await;

    assert_eq!(Some(resolved_identity(2)), record.map(|r| r.identity_address));

    assert_eq!(1, peer.gateway().encrypt_calls());
}

#[tokio::test]
async fn identity_flags_without_irk_are_skipped() {
    init_logging();

    let irk = 0x5566;

    let flagged = unkeyed_record(0)
        .with_device_type(DeviceType::BLE)
        .with_key_type(KeyType::PEER_ID);

    assert_eq!(None, flagged.irk);

    let peer = manager(11, vec![flagged, peer_record(1, irk)]);

    let record = peer.resolve_random_address(rpa_for(irk, [0x12, 0x34, 0x56])).await;

    assert_eq!(Some(resolved_identity(1)), record.map(|r| r.identity_address));

    assert_eq!(1, peer.gateway().encrypt_calls());
}

#[tokio::test]
async fn concurrent_resolution_is_rejected() {
    init_logging();

    let peer = manager(6, vec![unkeyed_record(0), peer_record(1, 0x10), peer_record(2, 0x20)]);

    let target = rpa_for(0x20, [7, 8, 9]);

    let first = peer.resolve_random_address(target);

    assert!(peer.is_resolving());

    let second = peer.resolve_random_address(target);

    let (first, second) = futures::join!(first, second);

    assert_eq!(None, second);

    assert_eq!(Some(resolved_identity(2)), first.map(|r| r.identity_address));

    assert_eq!(2, peer.gateway().encrypt_calls());

    assert!(!peer.is_resolving());

    // a later resolution is accepted
    assert!(peer.resolve_random_address(target).await.is_some());
}

#[tokio::test]
async fn rejection_mid_scan_does_not_disturb_scan() {
    init_logging();

    let peer = manager(7, vec![peer_record(1, 0x10), peer_record(2, 0x20), peer_record(3, 0x30)]);

    let target = rpa_for(0x30, [1, 1, 1]);

    let late = async {
        tokio::task::yield_now().await;

        assert!(peer.is_resolving());

        peer.resolve_random_address(rpa_for(0x10, [2, 2, 2])).await
    };

    let (first, late) = futures::join!(peer.resolve_random_address(target), late);

    assert_eq!(None, late);

    assert_eq!(Some(resolved_identity(3)), first.map(|r| r.identity_address));

    assert_eq!(3, peer.gateway().encrypt_calls());
}

#[tokio::test]
async fn failed_encryptions_exhaust_the_scan() {
    init_logging();

    let peer = manager(8, vec![peer_record(1, 0x10), unkeyed_record(2), peer_record(3, 0x30)]);

    peer.gateway().fail_encrypt(true);

    assert_eq!(None, peer.resolve_random_address(rpa_for(0x30, [3, 3, 3])).await);

    assert_eq!(2, peer.gateway().encrypt_calls());

    assert!(!peer.is_resolving());
}

#[test]
fn dropped_resolution_releases_the_session() {
    let peer = manager(9, vec![peer_record(1, 0x10)]);

    let pending = peer.resolve_random_address(rpa_for(0x10, [4, 4, 4]));

    assert!(peer.is_resolving());

    drop(pending);

    assert!(!peer.is_resolving());
}

#[tokio::test]
async fn session_driven_by_caller() {
    init_logging();

    let irk = 0x77;

    let peer = manager(10, vec![unkeyed_record(0), peer_record(1, 0x66), peer_record(2, irk)]);

    let mut session = ResolutionSession::new(rpa_for(irk, [5, 6, 7]));

    loop {
        let step = session.next_step(&*peer.records());

        match step {
            Step::Encrypt { irk, plain_text, .. } => {
                let cypher_text = peer.gateway().encrypt(irk, plain_text).await.ok();

                session.complete_encryption(cypher_text);
            }
            Step::Finished(index) => {
                assert_eq!(Some(2), index);

                break;
            }
        }
    }

    assert_eq!(ResolutionState::Matched(2), session.state());

    assert_eq!(2, peer.gateway().encrypt_calls());
}
