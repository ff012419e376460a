//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::UtxoSet;
    use crate::crypto::{address_from_string, KeyPair};
    use crate::error::ValidationError;
    use std::collections::HashSet;

    const BLOCK_TIME: u64 = 1_700_000_000_000;

    fn funded(keypair: &KeyPair, amount: u64) -> (UtxoSet, OutPoint) {
        let mut utxos = UtxoSet::new();
        let output = TransactionOutput {
            tx_id: [42u8; 32],
            index: 0,
            recipient: keypair.address().to_vec(),
            amount,
        };
        let outpoint = output.outpoint();
        utxos.insert(output);
        (utxos, outpoint)
    }

    fn spend(keypair: &KeyPair, inputs: &[OutPoint], outputs: &[u64]) -> Transaction {
        let bob = address_from_string("bob");
        let mut tx = Transaction::new(
            BLOCK_TIME - 1,
            inputs.iter().copied().map(InEntry::unsigned).collect(),
            outputs.iter().map(|&amount| OutEntry::new(bob, amount)).collect(),
        );
        tx.sign_inputs(keypair);
        tx
    }

    #[test]
    fn test_transfer_records_exec_info() {
        let keypair = KeyPair::generate();
        let (utxos, outpoint) = funded(&keypair, 100);
        let mut tx = spend(&keypair, &[outpoint], &[60, 30]);

        tx.run(&utxos, BLOCK_TIME, 0, Some(&HashSet::new())).unwrap();

        let info = tx.exec_info().unwrap();
        assert!(!info.coinbase);
        assert_eq!(info.fee, 10);
        assert_eq!(info.redeemed.len(), 1);
        assert_eq!(info.redeemed[0].outpoint(), outpoint);
        assert_eq!(info.generated.len(), 2);
        assert_eq!(info.generated[1].outpoint(), OutPoint::new(tx.id(), 1));
        // Execution never mutates the UTXO set.
        assert!(utxos.contains(&outpoint));
    }

    #[test]
    fn test_repeated_coinbase_is_rejected() {
        let miner = address_from_string("miner");
        let mut earlier = Transaction::coinbase(BLOCK_TIME - 10, miner, 50);
        earlier.run(&UtxoSet::new(), BLOCK_TIME - 10, 50, None).unwrap();
        let mut utxos = UtxoSet::new();
        utxos.apply(earlier.exec_info().unwrap());

        let mut copy = earlier.pending();
        let err = copy.run(&utxos, BLOCK_TIME, 50, None).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateOutput(_)));
        assert!(copy.exec_info().is_none());
    }

    #[test]
    fn test_outputs_exceeding_inputs_fail() {
        let keypair = KeyPair::generate();
        let (utxos, outpoint) = funded(&keypair, 100);
        let mut tx = spend(&keypair, &[outpoint], &[60, 50]);

        let err = tx.run(&utxos, BLOCK_TIME, 0, None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutputsExceedInputs {
                inputs: 100,
                outputs: 110
            }
        );
        assert!(tx.exec_info().is_none());
        assert_eq!(utxos.len(), 1);
    }

    #[test]
    fn test_spent_accumulator_blocks_double_spend() {
        let keypair = KeyPair::generate();
        let (utxos, outpoint) = funded(&keypair, 100);
        let mut tx = spend(&keypair, &[outpoint], &[50]);
        let spent: HashSet<OutPoint> = [outpoint].into_iter().collect();

        let err = tx.run(&utxos, BLOCK_TIME, 0, Some(&spent)).unwrap_err();
        assert!(matches!(err, ValidationError::DoubleSpend(_)));
    }

    #[test]
    fn test_duplicate_input_is_double_spend() {
        let keypair = KeyPair::generate();
        let (utxos, outpoint) = funded(&keypair, 100);
        let mut tx = spend(&keypair, &[outpoint, outpoint], &[150]);

        let err = tx.run(&utxos, BLOCK_TIME, 0, None).unwrap_err();
        assert!(matches!(err, ValidationError::DoubleSpend(_)));
    }

    #[test]
    fn test_wrong_owner_fails() {
        let owner = KeyPair::generate();
        let thief = KeyPair::generate();
        let (utxos, outpoint) = funded(&owner, 100);
        let mut tx = spend(&thief, &[outpoint], &[50]);

        let err = tx.run(&utxos, BLOCK_TIME, 0, None).unwrap_err();
        assert_eq!(err, ValidationError::RecipientMismatch(0));
    }

    #[test]
    fn test_tampered_transaction_fails_signature() {
        let keypair = KeyPair::generate();
        let (utxos, outpoint) = funded(&keypair, 100);
        let mut tx = spend(&keypair, &[outpoint], &[50]);
        tx.out_entries[0].amount = 90;

        let err = tx.run(&utxos, BLOCK_TIME, 0, None).unwrap_err();
        assert_eq!(err, ValidationError::BadSignature(0));
    }

    #[test]
    fn test_missing_output_fails() {
        let keypair = KeyPair::generate();
        let utxos = UtxoSet::new();
        let mut tx = spend(&keypair, &[OutPoint::new([1u8; 32], 0)], &[50]);

        let err = tx.run(&utxos, BLOCK_TIME, 0, None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingOutput(_)));
    }

    #[test]
    fn test_coinbase_shape_rules() {
        let utxos = UtxoSet::new();
        let miner = address_from_string("miner");

        let mut coinbase = Transaction::coinbase(BLOCK_TIME, miner, 40);
        coinbase.run(&utxos, BLOCK_TIME, 50, None).unwrap();
        let info = coinbase.exec_info().unwrap();
        assert!(info.coinbase);
        assert_eq!(info.fee, 10);
        assert!(coinbase.is_executed_coinbase());

        // No inputs and no reward.
        let mut empty = Transaction::coinbase(BLOCK_TIME, miner, 40);
        assert_eq!(
            empty.run(&utxos, BLOCK_TIME, 0, None),
            Err(ValidationError::CoinbaseShape)
        );

        // Inputs and a reward.
        let keypair = KeyPair::generate();
        let (utxos, outpoint) = funded(&keypair, 100);
        let mut both = spend(&keypair, &[outpoint], &[50]);
        assert_eq!(
            both.run(&utxos, BLOCK_TIME, 50, None),
            Err(ValidationError::CoinbaseShape)
        );
    }

    #[test]
    fn test_invalid_outputs_and_timestamps() {
        let utxos = UtxoSet::new();
        let miner = address_from_string("miner");

        let mut zero = Transaction::coinbase(BLOCK_TIME, miner, 0);
        assert_eq!(
            zero.run(&utxos, BLOCK_TIME, 50, None),
            Err(ValidationError::InvalidOutput(0))
        );

        let mut no_recipient = Transaction::new(
            BLOCK_TIME,
            vec![],
            vec![OutEntry {
                recipient: vec![],
                amount: 5,
            }],
        );
        assert_eq!(
            no_recipient.run(&utxos, BLOCK_TIME, 50, None),
            Err(ValidationError::InvalidOutput(0))
        );

        let mut late = Transaction::coinbase(BLOCK_TIME + 1, miner, 5);
        assert!(matches!(
            late.run(&utxos, BLOCK_TIME, 50, None),
            Err(ValidationError::TransactionAfterBlock { .. })
        ));
    }

    #[test]
    fn test_signatures_do_not_cover_themselves() {
        let keypair = KeyPair::generate();
        let (_, outpoint) = funded(&keypair, 100);
        let tx = spend(&keypair, &[outpoint], &[50]);

        let mut stripped = tx.clone();
        stripped.in_entries[0].signature.clear();
        assert_eq!(tx.sign_hash(), stripped.sign_hash());

        stripped.refresh_id();
        assert_ne!(tx.id(), stripped.id());
    }
}
