/// Execution of a single transaction against the UTXO set
use crate::blockchain::UtxoSet;
use crate::crypto::{address_of, verify_signature};
use crate::error::ValidationError;
use crate::transaction::types::{ExecInfo, OutPoint, Transaction, TransactionOutput};
use std::collections::HashSet;
use tracing::debug;

impl Transaction {
    /// Validates this transaction and records what it redeems and generates.
    ///
    /// `coinbase` is the reward available to a coinbase transaction and zero
    /// for every other one. `spent` holds outputs already redeemed earlier in
    /// the same block. The UTXO set itself is left untouched; the block's
    /// `apply` commits the recorded effects.
    pub fn run(
        &mut self,
        utxos: &UtxoSet,
        block_timestamp: u64,
        coinbase: u64,
        spent: Option<&HashSet<OutPoint>>,
    ) -> Result<(), ValidationError> {
        debug!(tx = %self.short_id(), "running transaction");

        if self.timestamp > block_timestamp {
            return Err(ValidationError::TransactionAfterBlock {
                tx: self.timestamp,
                block: block_timestamp,
            });
        }
        if (coinbase == 0) == self.in_entries.is_empty() {
            return Err(ValidationError::CoinbaseShape);
        }

        let sign_hash = self.sign_hash();
        let mut in_sum = coinbase;
        let mut redeemed = Vec::with_capacity(self.in_entries.len());
        let mut seen = HashSet::with_capacity(self.in_entries.len());

        for (i, input) in self.in_entries.iter().enumerate() {
            let outpoint = input.outpoint();
            let already_spent = spent.is_some_and(|spent| spent.contains(&outpoint));
            if already_spent || !seen.insert(outpoint) {
                return Err(ValidationError::DoubleSpend(outpoint.to_string()));
            }

            let txo = utxos
                .get(&outpoint)
                .ok_or_else(|| ValidationError::MissingOutput(outpoint.to_string()))?;

            verify_signature(&input.public_key, &sign_hash, &input.signature)
                .map_err(|_| ValidationError::BadSignature(i))?;

            if address_of(&input.public_key).as_slice() != txo.recipient.as_slice() {
                return Err(ValidationError::RecipientMismatch(i));
            }

            in_sum = in_sum
                .checked_add(txo.amount)
                .ok_or(ValidationError::Overflow)?;
            redeemed.push(txo.clone());
        }

        let mut out_sum: u64 = 0;
        let mut generated = Vec::with_capacity(self.out_entries.len());
        for (i, output) in self.out_entries.iter().enumerate() {
            if output.amount == 0 || output.recipient.is_empty() {
                return Err(ValidationError::InvalidOutput(i));
            }
            let index = u16::try_from(i).map_err(|_| ValidationError::InvalidOutput(i))?;

            out_sum = out_sum
                .checked_add(output.amount)
                .ok_or(ValidationError::Overflow)?;
            // An identical earlier transaction would have its outputs overwritten here.
            let outpoint = OutPoint::new(self.id(), index);
            if utxos.contains(&outpoint) {
                return Err(ValidationError::DuplicateOutput(outpoint.to_string()));
            }
            generated.push(TransactionOutput {
                tx_id: self.id(),
                index,
                recipient: output.recipient.clone(),
                amount: output.amount,
            });
        }

        if out_sum > in_sum {
            return Err(ValidationError::OutputsExceedInputs {
                inputs: in_sum,
                outputs: out_sum,
            });
        }

        self.set_exec_info(ExecInfo {
            coinbase: coinbase != 0,
            redeemed,
            generated,
            fee: in_sum - out_sum,
        });
        Ok(())
    }
}
