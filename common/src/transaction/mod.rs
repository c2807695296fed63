mod builder;
mod error;

pub use builder::MetaTransactionBuilder;
pub use error::TransactionError;

use serde::{Deserialize, Serialize};

use crate::{
    account::Nonce,
    asset::Denomination,
    crypto::{Address, Hash, Signature},
    ledger::Amount,
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::{TimestampMillis, TimestampSeconds},
};

// this enum represent all payment modes a meta-transaction can use.
// The mode is observable metadata in this core: it selects which address
// will be debited once the settlement layer charges gas.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Normal,
    Sponsored,
    Relayer,
    Batch,
}

impl Serializer for PaymentMode {
    fn write(&self, writer: &mut Writer) {
        let v = match self {
            PaymentMode::Normal => 0u8,
            PaymentMode::Sponsored => 1u8,
            PaymentMode::Relayer => 2u8,
            PaymentMode::Batch => 3u8,
        };
        writer.write_u8(v);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(PaymentMode::Normal),
            1 => Ok(PaymentMode::Sponsored),
            2 => Ok(PaymentMode::Relayer),
            3 => Ok(PaymentMode::Batch),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1
    }
}

// A wallet-owner-signed instruction executed by the wallet engine.
//
// tx_id is a deterministic digest of every pre-signature field; the
// signature covers tx_id. `executed` transitions false -> true exactly
// once, at which point `execution_hash` is set and never cleared.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MetaTransaction {
    tx_id: Hash,
    from: Address,
    to: Address,
    value: Amount,
    // Opaque call data, bounded at construction
    data: Vec<u8>,
    gas_limit: u64,
    gas_price: u64,
    nonce: Nonce,
    payment_mode: PaymentMode,
    sponsor: Option<Address>,
    relayer: Option<Address>,
    // Seconds since epoch; the engine refuses execution past this point
    deadline: TimestampSeconds,
    signature: Signature,
    executed: bool,
    execution_hash: Option<Hash>,
}

impl MetaTransaction {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        tx_id: Hash,
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
        signature: Signature,
    ) -> Self {
        Self {
            tx_id,
            from,
            to,
            value,
            data,
            gas_limit,
            gas_price,
            nonce,
            payment_mode,
            sponsor,
            relayer,
            deadline,
            signature,
            executed: false,
            execution_hash: None,
        }
    }

    pub fn get_tx_id(&self) -> &Hash {
        &self.tx_id
    }

    pub fn get_from(&self) -> &Address {
        &self.from
    }

    pub fn get_to(&self) -> &Address {
        &self.to
    }

    pub fn get_value(&self) -> Amount {
        self.value
    }

    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    pub fn get_gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn get_gas_price(&self) -> u64 {
        self.gas_price
    }

    // Gas is a contract for the future settlement layer: computed and
    // exposed, never charged from balances in this core.
    pub fn gas_cost(&self) -> u128 {
        self.gas_limit as u128 * self.gas_price as u128
    }

    pub fn get_nonce(&self) -> Nonce {
        self.nonce
    }

    pub fn get_payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }

    pub fn get_sponsor(&self) -> &Option<Address> {
        &self.sponsor
    }

    pub fn get_relayer(&self) -> &Option<Address> {
        &self.relayer
    }

    pub fn get_deadline(&self) -> TimestampSeconds {
        self.deadline
    }

    pub fn get_signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn get_execution_hash(&self) -> &Option<Hash> {
        &self.execution_hash
    }

    pub fn is_expired(&self, now: TimestampSeconds) -> bool {
        now > self.deadline
    }

    // Canonical encoding of every field covered by tx_id
    pub fn signing_payload(
        from: &Address,
        to: &Address,
        value: Amount,
        data: &[u8],
        gas_limit: u64,
        gas_price: u64,
        nonce: Nonce,
        payment_mode: PaymentMode,
        sponsor: &Option<Address>,
        relayer: &Option<Address>,
        deadline: TimestampSeconds,
    ) -> Vec<u8> {
        let mut writer = Writer::new();
        from.write(&mut writer);
        to.write(&mut writer);
        writer.write_u128(&value);
        writer.write_u16(data.len() as u16);
        writer.write_bytes(data);
        writer.write_u64(&gas_limit);
        writer.write_u64(&gas_price);
        writer.write_u64(&nonce);
        payment_mode.write(&mut writer);
        sponsor.write(&mut writer);
        relayer.write(&mut writer);
        writer.write_u64(&deadline);
        writer.bytes()
    }

    // Mark as executed; only the wallet engine calls this, under the
    // wallet lock, after every validation has passed.
    pub fn mark_executed(&mut self, execution_hash: Hash) {
        self.executed = true;
        self.execution_hash = Some(execution_hash);
    }

    // The bookkeeping row for a sponsored execution.
    // `paid` stays false in this core: gas accounting is observable
    // metadata, settlement happens in a future layer.
    pub fn sponsorship_record(&self) -> Option<SponsorshipRecord> {
        let sponsor = self.sponsor.as_ref()?;
        Some(SponsorshipRecord {
            user: self.from.clone(),
            sponsor: sponsor.clone(),
            gas_cost: self.gas_cost(),
            payment_token: Denomination::USDTg,
            payment_amount: 0,
            deadline: self.deadline,
            paid: false,
        })
    }
}

impl Serializer for MetaTransaction {
    fn write(&self, writer: &mut Writer) {
        self.tx_id.write(writer);
        self.from.write(writer);
        self.to.write(writer);
        writer.write_u128(&self.value);
        self.data.write(writer);
        writer.write_u64(&self.gas_limit);
        writer.write_u64(&self.gas_price);
        writer.write_u64(&self.nonce);
        self.payment_mode.write(writer);
        self.sponsor.write(writer);
        self.relayer.write(writer);
        writer.write_u64(&self.deadline);
        self.signature.write(writer);
        writer.write_bool(self.executed);
        self.execution_hash.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            tx_id: Hash::read(reader)?,
            from: Address::read(reader)?,
            to: Address::read(reader)?,
            value: reader.read_u128()?,
            data: Vec::read(reader)?,
            gas_limit: reader.read_u64()?,
            gas_price: reader.read_u64()?,
            nonce: reader.read_u64()?,
            payment_mode: PaymentMode::read(reader)?,
            sponsor: Option::read(reader)?,
            relayer: Option::read(reader)?,
            deadline: reader.read_u64()?,
            signature: Signature::read(reader)?,
            executed: reader.read_bool()?,
            execution_hash: Option::read(reader)?,
        })
    }
}

// An atomic bundle of meta-transactions executed under a single envelope.
// Every contained transaction must originate from the same wallet; one
// failing leg fails the whole batch.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BatchTransaction {
    batch_id: Hash,
    wallet_address: Address,
    transactions: Vec<MetaTransaction>,
    total_gas_limit: u64,
    executed: bool,
    execution_time: Option<TimestampMillis>,
}

impl BatchTransaction {
    pub fn new(
        batch_id: Hash,
        wallet_address: Address,
        transactions: Vec<MetaTransaction>,
    ) -> Result<Self, TransactionError> {
        if transactions.is_empty() {
            return Err(TransactionError::EmptyBatch);
        }

        if transactions.len() > crate::config::MAX_BATCH_META_TX {
            return Err(TransactionError::BatchTooLarge(
                transactions.len(),
                crate::config::MAX_BATCH_META_TX,
            ));
        }

        let mut total_gas_limit: u64 = 0;
        for tx in &transactions {
            if tx.get_from() != &wallet_address {
                return Err(TransactionError::BatchWalletMismatch {
                    expected: wallet_address,
                    found: tx.get_from().clone(),
                });
            }

            total_gas_limit = total_gas_limit
                .checked_add(tx.get_gas_limit())
                .ok_or(TransactionError::GasOverflow)?;
        }

        Ok(Self {
            batch_id,
            wallet_address,
            transactions,
            total_gas_limit,
            executed: false,
            execution_time: None,
        })
    }

    pub fn get_batch_id(&self) -> &Hash {
        &self.batch_id
    }

    pub fn get_wallet_address(&self) -> &Address {
        &self.wallet_address
    }

    pub fn get_transactions(&self) -> &[MetaTransaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<MetaTransaction> {
        self.transactions
    }

    pub fn get_total_gas_limit(&self) -> u64 {
        self.total_gas_limit
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn get_execution_time(&self) -> Option<TimestampMillis> {
        self.execution_time
    }

    pub fn mark_executed(&mut self, time: TimestampMillis) {
        self.executed = true;
        self.execution_time = Some(time);
    }
}

// Gasless sponsorship bookkeeping.
// `paid` is never driven by a balance mutation in this core.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SponsorshipRecord {
    pub user: Address,
    pub sponsor: Address,
    pub gas_cost: u128,
    pub payment_token: Denomination,
    pub payment_amount: Amount,
    pub deadline: TimestampSeconds,
    pub paid: bool,
}

impl Serializer for SponsorshipRecord {
    fn write(&self, writer: &mut Writer) {
        self.user.write(writer);
        self.sponsor.write(writer);
        writer.write_u128(&self.gas_cost);
        self.payment_token.write(writer);
        writer.write_u128(&self.payment_amount);
        writer.write_u64(&self.deadline);
        writer.write_bool(self.paid);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            user: Address::read(reader)?,
            sponsor: Address::read(reader)?,
            gas_cost: reader.read_u128()?,
            payment_token: Denomination::read(reader)?,
            payment_amount: reader.read_u128()?,
            deadline: reader.read_u64()?,
            paid: reader.read_bool()?,
        })
    }
}

#[cfg(test)]
mod tests;
