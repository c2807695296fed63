use super::{MetaTransaction, PaymentMode, TransactionError};
use crate::{
    account::Nonce,
    config::MAX_META_TX_DATA_SIZE,
    crypto::{Address, Hasher, Signature},
    ledger::Amount,
    time::TimestampSeconds,
};

// Fluent builder assembling a meta-transaction.
// The tx_id is derived from every pre-signature field through the injected
// hasher, so the same inputs always produce the same identifier.
pub struct MetaTransactionBuilder {
    from: Address,
    to: Address,
    value: Amount,
    data: Vec<u8>,
    gas_limit: u64,
    gas_price: u64,
    nonce: Nonce,
    payment_mode: PaymentMode,
    sponsor: Option<Address>,
    relayer: Option<Address>,
    deadline: TimestampSeconds,
}

impl MetaTransactionBuilder {
    pub fn new(from: Address, to: Address, nonce: Nonce, deadline: TimestampSeconds) -> Self {
        Self {
            from,
            to,
            value: 0,
            data: Vec::new(),
            gas_limit: 0,
            gas_price: 0,
            nonce,
            payment_mode: PaymentMode::Normal,
            sponsor: None,
            relayer: None,
            deadline,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn with_gas(mut self, gas_limit: u64, gas_price: u64) -> Self {
        self.gas_limit = gas_limit;
        self.gas_price = gas_price;
        self
    }

    pub fn sponsored_by(mut self, sponsor: Address) -> Self {
        self.payment_mode = PaymentMode::Sponsored;
        self.sponsor = Some(sponsor);
        self
    }

    pub fn relayed_by(mut self, relayer: Address) -> Self {
        self.payment_mode = PaymentMode::Relayer;
        self.relayer = Some(relayer);
        self
    }

    pub fn with_payment_mode(mut self, mode: PaymentMode) -> Self {
        self.payment_mode = mode;
        self
    }

    // The canonical bytes the signature must cover
    pub fn signing_payload(&self) -> Vec<u8> {
        MetaTransaction::signing_payload(
            &self.from,
            &self.to,
            self.value,
            &self.data,
            self.gas_limit,
            self.gas_price,
            self.nonce,
            self.payment_mode,
            &self.sponsor,
            &self.relayer,
            self.deadline,
        )
    }

    pub fn build(
        self,
        hasher: &dyn Hasher,
        signature: Signature,
    ) -> Result<MetaTransaction, TransactionError> {
        if self.data.len() > MAX_META_TX_DATA_SIZE {
            return Err(TransactionError::DataTooLarge {
                size: self.data.len(),
                maximum: MAX_META_TX_DATA_SIZE,
            });
        }

        match self.payment_mode {
            PaymentMode::Sponsored if self.sponsor.is_none() => {
                return Err(TransactionError::MissingSponsor)
            }
            PaymentMode::Relayer if self.relayer.is_none() => {
                return Err(TransactionError::MissingRelayer)
            }
            _ => {}
        }

        let tx_id = hasher.hash(&self.signing_payload());
        Ok(MetaTransaction::new(
            tx_id,
            self.from,
            self.to,
            self.value,
            self.data,
            self.gas_limit,
            self.gas_price,
            self.nonce,
            self.payment_mode,
            self.sponsor,
            self.relayer,
            self.deadline,
            signature,
        ))
    }
}
