//! End-to-end framing tests over mirrored connection state.

use eyre::Result;
use rand::{thread_rng, RngCore};
use wireseal_crypto::Backend;
use wireseal_stream::{SessionConfig, SessionCrypto, WireError};

const SECRET: [u8; 32] = [0x5c; 32];
const IV: [u8; 16] = [0xa7; 16];

fn mirrored() -> Result<(SessionCrypto, SessionCrypto)> {
    let sender = SessionCrypto::new(&SECRET, &IV, SessionConfig::default())?;
    let receiver = SessionCrypto::new(&SECRET, &IV, SessionConfig::default())?;

    Ok((sender, receiver))
}

#[test]
fn round_trip_small_payloads() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    for payload in [
        &b""[..],
        &b"x"[..],
        &b"a somewhat longer payload with some repetition repetition"[..],
        &[0_u8; 1024][..],
    ] {
        let unit = sender.encode(payload)?;
        assert_eq!(receiver.decode(unit)?, payload);
    }

    Ok(())
}

#[test]
fn round_trip_multi_megabyte_payload() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    // Half incompressible, half repetitive, in one packet.
    let mut payload = vec![0_u8; 3 * 1024 * 1024];
    let half = payload.len() / 2;
    thread_rng().fill_bytes(&mut payload[..half]);

    let unit = sender.encode(&payload)?;
    assert_eq!(receiver.decode(unit)?, payload);

    // The keystream continues cleanly after a large unit.
    let unit = sender.encode(b"follow-up")?;
    assert_eq!(receiver.decode(unit)?, b"follow-up".to_vec());

    Ok(())
}

#[test]
fn counters_track_processed_packets() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    for i in 0..3_u8 {
        let unit = sender.encode(&[i])?;
        let _ = receiver.decode(unit)?;
    }

    let mut tampered = sender.encode(b"fourth")?;
    tampered[0] ^= 0x01;

    assert!(matches!(
        receiver.decode(tampered),
        Err(WireError::Integrity { counter: 3 })
    ));

    // The receive counter advances on integrity faults too.
    let (encoder, _) = sender.split();
    let (_, decoder) = receiver.split();
    assert_eq!(encoder.count(), 4);
    assert_eq!(decoder.count(), 4);

    Ok(())
}

#[test]
fn single_bit_flips_are_detected() -> Result<()> {
    let probe = {
        let (mut sender, _) = mirrored()?;
        sender.encode(b"a payload worth protecting")?
    };

    // First, middle, and last byte cover the payload and tag regions.
    for position in [0, probe.len() / 2, probe.len() - 1] {
        let (mut sender, mut receiver) = mirrored()?;

        let mut unit = sender.encode(b"a payload worth protecting")?;
        unit[position] ^= 0x80;

        assert!(matches!(
            receiver.decode(unit),
            Err(WireError::Integrity { counter: 0 })
        ));
    }

    Ok(())
}

#[test]
fn out_of_order_units_fail_integrity() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    let _first = sender.encode(b"packet zero")?;
    let second = sender.encode(b"packet one")?;

    assert!(matches!(
        receiver.decode(second),
        Err(WireError::Integrity { counter: 0 })
    ));

    Ok(())
}

#[test]
fn duplicated_units_fail_integrity() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    let unit = sender.encode(b"once only")?;

    assert_eq!(receiver.decode(unit.clone())?, b"once only".to_vec());
    assert!(matches!(
        receiver.decode(unit),
        Err(WireError::Integrity { counter: 1 })
    ));

    Ok(())
}

#[test]
fn decoder_poisons_after_integrity_fault() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    let mut tampered = sender.encode(b"first")?;
    tampered[0] ^= 0xff;
    let good = sender.encode(b"second")?;

    assert!(matches!(
        receiver.decode(tampered),
        Err(WireError::Integrity { counter: 0 })
    ));

    // Even a unit the peer sealed correctly is refused now.
    assert!(matches!(
        receiver.decode(good),
        Err(WireError::Desynchronized)
    ));

    let (_, decoder) = receiver.split();
    assert!(decoder.is_poisoned());

    Ok(())
}

#[test]
fn truncated_wire_unit_is_fatal() -> Result<()> {
    let (mut sender, mut receiver) = mirrored()?;

    assert!(matches!(
        receiver.decode(vec![0xaa; 4]),
        Err(WireError::Truncated { len: 4 })
    ));

    // The keystream consumed those bytes, so the stream is unrecoverable.
    let unit = sender.encode(b"late")?;
    assert!(matches!(
        receiver.decode(unit),
        Err(WireError::Desynchronized)
    ));

    let (_, decoder) = receiver.split();
    assert_eq!(decoder.count(), 1);

    Ok(())
}

#[test]
fn wrong_secret_fails_integrity() -> Result<()> {
    let mut sender = SessionCrypto::new(&SECRET, &IV, SessionConfig::default())?;
    let mut receiver = SessionCrypto::new(&[0xee; 32], &IV, SessionConfig::default())?;

    let unit = sender.encode(b"keyed to someone else")?;

    assert!(matches!(
        receiver.decode(unit),
        Err(WireError::Integrity { counter: 0 })
    ));

    Ok(())
}

#[test]
fn handshake_material_is_validated() {
    let short_secret = SessionCrypto::new(&[0_u8; 16], &IV, SessionConfig::default());
    assert!(matches!(short_secret, Err(WireError::Engine(_))));

    let short_iv = SessionCrypto::new(&SECRET, &[0_u8; 8], SessionConfig::default());
    assert!(matches!(short_iv, Err(WireError::Engine(_))));
}

#[test]
fn explicit_backends_interoperate() -> Result<()> {
    let portable = SessionConfig {
        backend: Some(Backend::Portable),
        ..SessionConfig::default()
    };
    let accelerated = SessionConfig {
        backend: Some(Backend::Accelerated),
        ..SessionConfig::default()
    };

    let mut sender = SessionCrypto::new(&SECRET, &IV, portable)?;
    let mut receiver = SessionCrypto::new(&SECRET, &IV, accelerated)?;

    for i in 0..10_u32 {
        let payload = i.to_le_bytes();
        let unit = sender.encode(&payload)?;
        assert_eq!(receiver.decode(unit)?, payload);
    }

    Ok(())
}

#[test]
fn compression_levels_do_not_need_to_match() -> Result<()> {
    let fast = SessionConfig {
        compression_level: 1,
        ..SessionConfig::default()
    };

    let mut sender = SessionCrypto::new(&SECRET, &IV, fast)?;
    let mut receiver = SessionCrypto::new(&SECRET, &IV, SessionConfig::default())?;

    let unit = sender.encode(b"level is a sender-local choice")?;
    assert_eq!(receiver.decode(unit)?, b"level is a sender-local choice".to_vec());

    Ok(())
}
