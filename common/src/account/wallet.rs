use serde::{Deserialize, Serialize};

use super::{Nonce, WalletError};
use crate::{
    config::MAX_RECOVERY_ADDRESSES,
    crypto::{Address, Hash},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

// this enum represent all account flavors a smart-contract wallet can take
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Eoa,
    SmartContract,
    MultiSig,
    SocialRecovery,
    QuantumSafe,
}

impl Serializer for AccountType {
    fn write(&self, writer: &mut Writer) {
        let v = match self {
            AccountType::Eoa => 0u8,
            AccountType::SmartContract => 1u8,
            AccountType::MultiSig => 2u8,
            AccountType::SocialRecovery => 3u8,
            AccountType::QuantumSafe => 4u8,
        };
        writer.write_u8(v);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(AccountType::Eoa),
            1 => Ok(AccountType::SmartContract),
            2 => Ok(AccountType::MultiSig),
            3 => Ok(AccountType::SocialRecovery),
            4 => Ok(AccountType::QuantumSafe),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1
    }
}

// A smart-contract wallet registry row.
//
// Lifecycle: Created -> (initialize) -> Initialized/Active <-> Deactivated.
// A wallet is never deleted; deactivation is a flag. The nonce only ever
// increases, and only by one per executed meta-transaction.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Wallet {
    // Primary key
    address: Address,
    // Current owner, may change through social recovery
    owner_address: Address,
    account_type: AccountType,
    // Next expected meta-transaction nonce
    nonce: Nonce,
    initialized: bool,
    active: bool,
    created_at: TimestampMillis,
    last_used_at: TimestampMillis,
    // Opaque implementation reference set at initialization
    implementation_ref: Option<Hash>,
    // Opaque factory reference set at creation
    factory_ref: Option<Hash>,
    // Up to 5 recovery addresses, order is meaningful
    recovery_set: Vec<Address>,
    // How many recovery members must approve an ownership change
    recovery_threshold: u8,
    // Opaque post-quantum material, no algorithm claimed
    quantum_material: Option<Vec<u8>>,
}

impl Wallet {
    pub fn new(
        address: Address,
        owner_address: Address,
        account_type: AccountType,
        factory_ref: Option<Hash>,
        created_at: TimestampMillis,
    ) -> Self {
        Self {
            address,
            owner_address,
            account_type,
            nonce: 0,
            initialized: false,
            active: false,
            created_at,
            last_used_at: created_at,
            implementation_ref: None,
            factory_ref,
            recovery_set: Vec::new(),
            recovery_threshold: 0,
            quantum_material: None,
        }
    }

    pub fn get_address(&self) -> &Address {
        &self.address
    }

    pub fn get_owner(&self) -> &Address {
        &self.owner_address
    }

    pub fn get_account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn get_nonce(&self) -> Nonce {
        self.nonce
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get_created_at(&self) -> TimestampMillis {
        self.created_at
    }

    pub fn get_last_used_at(&self) -> TimestampMillis {
        self.last_used_at
    }

    pub fn get_implementation_ref(&self) -> &Option<Hash> {
        &self.implementation_ref
    }

    pub fn get_factory_ref(&self) -> &Option<Hash> {
        &self.factory_ref
    }

    pub fn get_recovery_set(&self) -> &[Address] {
        &self.recovery_set
    }

    pub fn get_recovery_threshold(&self) -> u8 {
        self.recovery_threshold
    }

    pub fn get_quantum_material(&self) -> &Option<Vec<u8>> {
        &self.quantum_material
    }

    pub fn set_quantum_material(&mut self, material: Option<Vec<u8>>) {
        self.quantum_material = material;
    }

    // Created -> Initialized, wallet becomes active immediately
    pub fn initialize(&mut self, implementation_ref: Hash) -> Result<(), WalletError> {
        if self.initialized {
            return Err(WalletError::AlreadyInitialized(self.address.clone()));
        }

        self.initialized = true;
        self.active = true;
        self.implementation_ref = Some(implementation_ref);
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), WalletError> {
        if !self.initialized {
            return Err(WalletError::NotInitialized(self.address.clone()));
        }

        self.active = false;
        Ok(())
    }

    pub fn reactivate(&mut self) -> Result<(), WalletError> {
        if !self.initialized {
            return Err(WalletError::NotInitialized(self.address.clone()));
        }

        self.active = true;
        Ok(())
    }

    pub fn configure_recovery(
        &mut self,
        recovery_set: Vec<Address>,
        threshold: u8,
    ) -> Result<(), WalletError> {
        if recovery_set.len() > MAX_RECOVERY_ADDRESSES {
            return Err(WalletError::RecoverySetTooLarge(
                recovery_set.len(),
                MAX_RECOVERY_ADDRESSES,
            ));
        }

        if threshold == 0 || threshold as usize > recovery_set.len() {
            return Err(WalletError::ThresholdOutOfRange {
                threshold,
                members: recovery_set.len(),
            });
        }

        self.recovery_set = recovery_set;
        self.recovery_threshold = threshold;
        Ok(())
    }

    // Advance the nonce by exactly one and stamp the usage time.
    // Must only be called under the wallet lock, after a successful
    // meta-transaction execution.
    pub fn advance_nonce(&mut self, now: TimestampMillis) -> Nonce {
        self.nonce += 1;
        self.last_used_at = now;
        self.nonce
    }

    // Ownership transfer through a verified recovery session
    pub fn transfer_ownership(&mut self, new_owner: Address) {
        self.owner_address = new_owner;
    }
}

impl Serializer for Wallet {
    fn write(&self, writer: &mut Writer) {
        self.address.write(writer);
        self.owner_address.write(writer);
        self.account_type.write(writer);
        writer.write_u64(&self.nonce);
        writer.write_bool(self.initialized);
        writer.write_bool(self.active);
        writer.write_u64(&self.created_at);
        writer.write_u64(&self.last_used_at);
        self.implementation_ref.write(writer);
        self.factory_ref.write(writer);
        self.recovery_set.write(writer);
        writer.write_u8(self.recovery_threshold);
        self.quantum_material.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            address: Address::read(reader)?,
            owner_address: Address::read(reader)?,
            account_type: AccountType::read(reader)?,
            nonce: reader.read_u64()?,
            initialized: reader.read_bool()?,
            active: reader.read_bool()?,
            created_at: reader.read_u64()?,
            last_used_at: reader.read_u64()?,
            implementation_ref: Option::read(reader)?,
            factory_ref: Option::read(reader)?,
            recovery_set: Vec::read(reader)?,
            recovery_threshold: reader.read_u8()?,
            quantum_material: Option::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;

    fn wallet() -> Wallet {
        Wallet::new(
            Address::from_hash(&hash(b"wallet")),
            Address::from_hash(&hash(b"owner")),
            AccountType::SmartContract,
            None,
            1_000,
        )
    }

    #[test]
    fn test_new_wallet_starts_created() {
        let wallet = wallet();
        assert_eq!(wallet.get_nonce(), 0);
        assert!(!wallet.is_initialized());
        assert!(!wallet.is_active());
    }

    #[test]
    fn test_initialize_activates() {
        let mut wallet = wallet();
        wallet.initialize(hash(b"impl")).unwrap();
        assert!(wallet.is_initialized());
        assert!(wallet.is_active());

        // second initialization is refused
        assert!(wallet.initialize(hash(b"impl2")).is_err());
    }

    #[test]
    fn test_deactivate_requires_initialized() {
        let mut wallet = wallet();
        assert!(wallet.deactivate().is_err());

        wallet.initialize(hash(b"impl")).unwrap();
        wallet.deactivate().unwrap();
        assert!(!wallet.is_active());
        assert!(wallet.is_initialized());

        wallet.reactivate().unwrap();
        assert!(wallet.is_active());
    }

    #[test]
    fn test_configure_recovery_bounds() {
        let mut wallet = wallet();
        let members: Vec<Address> = (0..3)
            .map(|i| Address::from_hash(&hash(&[i as u8])))
            .collect();

        assert!(wallet.configure_recovery(members.clone(), 0).is_err());
        assert!(wallet.configure_recovery(members.clone(), 4).is_err());
        wallet.configure_recovery(members, 2).unwrap();
        assert_eq!(wallet.get_recovery_threshold(), 2);
        assert_eq!(wallet.get_recovery_set().len(), 3);

        let too_many: Vec<Address> = (0..6)
            .map(|i| Address::from_hash(&hash(&[i as u8, 1])))
            .collect();
        assert!(wallet.configure_recovery(too_many, 2).is_err());
    }

    #[test]
    fn test_advance_nonce_is_monotone() {
        let mut wallet = wallet();
        assert_eq!(wallet.advance_nonce(2_000), 1);
        assert_eq!(wallet.advance_nonce(3_000), 2);
        assert_eq!(wallet.get_last_used_at(), 3_000);
    }

    #[test]
    fn test_serializer_roundtrip() {
        let mut wallet = wallet();
        wallet.initialize(hash(b"impl")).unwrap();
        wallet
            .configure_recovery(vec![Address::from_hash(&hash(b"guardian"))], 1)
            .unwrap();

        let decoded = Wallet::from_bytes(&wallet.to_bytes()).unwrap();
        assert_eq!(decoded.get_address(), wallet.get_address());
        assert_eq!(decoded.get_nonce(), wallet.get_nonce());
        assert_eq!(decoded.is_active(), wallet.is_active());
        assert_eq!(decoded.get_recovery_set(), wallet.get_recovery_set());
    }
}
