use super::*;
use crate::{
    config::MAX_META_TX_DATA_SIZE,
    crypto::{hash, Blake3Hasher, RecoveredOwnerVerifier, SignatureVerifier},
};

fn address(seed: &[u8]) -> Address {
    Address::from_hash(&hash(seed))
}

fn build_meta_tx(nonce: Nonce) -> MetaTransaction {
    let from = address(b"from");
    let builder = MetaTransactionBuilder::new(from.clone(), address(b"to"), nonce, 10_000)
        .with_value(5)
        .with_gas(21_000, 2);
    let signature = RecoveredOwnerVerifier::sign(&builder.signing_payload(), &from);
    builder.build(&Blake3Hasher, signature).unwrap()
}

#[test]
fn test_tx_id_is_deterministic() {
    let a = build_meta_tx(0);
    let b = build_meta_tx(0);
    assert_eq!(a.get_tx_id(), b.get_tx_id());

    let c = build_meta_tx(1);
    assert_ne!(a.get_tx_id(), c.get_tx_id());
}

#[test]
fn test_data_size_is_bounded() {
    let from = address(b"from");
    let builder = MetaTransactionBuilder::new(from.clone(), address(b"to"), 0, 10_000)
        .with_data(vec![0u8; MAX_META_TX_DATA_SIZE + 1]);
    let signature = RecoveredOwnerVerifier::sign(&builder.signing_payload(), &from);
    assert!(matches!(
        builder.build(&Blake3Hasher, signature),
        Err(TransactionError::DataTooLarge { .. })
    ));
}

#[test]
fn test_sponsored_mode_requires_sponsor() {
    let from = address(b"from");
    let builder = MetaTransactionBuilder::new(from.clone(), address(b"to"), 0, 10_000)
        .with_payment_mode(PaymentMode::Sponsored);
    let signature = RecoveredOwnerVerifier::sign(&builder.signing_payload(), &from);
    assert!(matches!(
        builder.build(&Blake3Hasher, signature),
        Err(TransactionError::MissingSponsor)
    ));
}

#[test]
fn test_signature_covers_payload() {
    let tx = build_meta_tx(0);
    let verifier = RecoveredOwnerVerifier;
    let payload = MetaTransaction::signing_payload(
        tx.get_from(),
        tx.get_to(),
        tx.get_value(),
        tx.get_data(),
        tx.get_gas_limit(),
        tx.get_gas_price(),
        tx.get_nonce(),
        tx.get_payment_mode(),
        tx.get_sponsor(),
        tx.get_relayer(),
        tx.get_deadline(),
    );
    assert!(verifier.verify(&payload, tx.get_signature(), tx.get_from()));
}

#[test]
fn test_gas_cost_is_exposed_not_charged() {
    let tx = build_meta_tx(0);
    assert_eq!(tx.gas_cost(), 42_000);
}

#[test]
fn test_sponsorship_record_is_bookkeeping_only() {
    let from = address(b"from");
    let sponsor = address(b"sponsor");
    let builder = MetaTransactionBuilder::new(from.clone(), address(b"to"), 0, 10_000)
        .with_gas(50_000, 4)
        .sponsored_by(sponsor.clone());
    let signature = RecoveredOwnerVerifier::sign(&builder.signing_payload(), &from);
    let tx = builder.build(&Blake3Hasher, signature).unwrap();

    let record = tx.sponsorship_record().unwrap();
    assert_eq!(record.user, from);
    assert_eq!(record.sponsor, sponsor);
    assert_eq!(record.gas_cost, 200_000);
    assert!(!record.paid);

    // a normal transaction has no sponsorship row
    let plain = build_meta_tx(0);
    assert!(plain.sponsorship_record().is_none());
}

#[test]
fn test_expiry() {
    let tx = build_meta_tx(0);
    assert!(!tx.is_expired(10_000));
    assert!(tx.is_expired(10_001));
}

#[test]
fn test_meta_tx_serializer_roundtrip() {
    let mut tx = build_meta_tx(7);
    tx.mark_executed(hash(b"exec"));

    let decoded = MetaTransaction::from_bytes(&tx.to_bytes()).unwrap();
    assert_eq!(decoded.get_tx_id(), tx.get_tx_id());
    assert_eq!(decoded.get_nonce(), 7);
    assert!(decoded.is_executed());
    assert_eq!(decoded.get_execution_hash(), tx.get_execution_hash());
}

#[test]
fn test_batch_rejects_foreign_wallet() {
    let tx = build_meta_tx(0);
    let result = BatchTransaction::new(hash(b"batch"), address(b"someone else"), vec![tx]);
    assert!(matches!(
        result,
        Err(TransactionError::BatchWalletMismatch { .. })
    ));
}

#[test]
fn test_batch_sums_gas() {
    let a = build_meta_tx(0);
    let b = build_meta_tx(1);
    let wallet = a.get_from().clone();
    let batch = BatchTransaction::new(hash(b"batch"), wallet, vec![a, b]).unwrap();
    assert_eq!(batch.get_total_gas_limit(), 42_000);
    assert!(!batch.is_executed());
}

#[test]
fn test_empty_batch_is_rejected() {
    let result = BatchTransaction::new(hash(b"batch"), address(b"from"), Vec::new());
    assert!(matches!(result, Err(TransactionError::EmptyBatch)));
}
