//! Token-budget chunker.
//!
//! Greedily groups an ordered sequence of items into batches whose cumulative
//! token cost stays within a budget, using a pluggable cost function. Used by
//! the transformation pipeline to pack as many files as possible into each
//! completion request.
//!
//! The chunker is a lazy iterator: consumers that process one batch at a time
//! (transform-and-discard loops) never hold more than one batch's worth of
//! items beyond the source sequence itself.
//!
//! # Budget policy
//!
//! A single item whose own cost exceeds the budget is emitted alone in its
//! own over-budget batch. The chunker never fails on and never truncates such
//! an item; downstream consumers apply their own truncation if they need one.

use crate::error::{Error, Result};

/// Approximate chars-per-token ratio for rough budget accounting.
const CHARS_PER_TOKEN: usize = 4;

/// Rough token count for a string: character count divided by four,
/// rounded up. Callers needing exact counts supply their own cost function
/// to [`chunk_by_budget`].
pub fn approx_token_len(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Lazily batch `items` so each batch's total cost fits `max_budget`.
///
/// Single greedy pass; input order is preserved within and across batches,
/// and the concatenation of all batches equals the input sequence. Identical
/// input and cost function always produce identical batch boundaries.
///
/// # Errors
///
/// `max_budget == 0` is rejected with [`Error::InvalidArgument`].
pub fn chunk_by_budget<T, I, F>(
    items: I,
    max_budget: usize,
    cost_fn: F,
) -> Result<TokenBudgetChunks<I::IntoIter, F>>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> usize,
{
    if max_budget == 0 {
        return Err(Error::invalid_argument("max_budget must be > 0"));
    }
    Ok(TokenBudgetChunks {
        items: items.into_iter(),
        carry: None,
        max_budget,
        cost_fn,
    })
}

/// Iterator of batches produced by [`chunk_by_budget`].
pub struct TokenBudgetChunks<I, F>
where
    I: Iterator,
{
    items: I,
    /// Item that closed the previous batch; opens the next one.
    carry: Option<I::Item>,
    max_budget: usize,
    cost_fn: F,
}

impl<I, F> Iterator for TokenBudgetChunks<I, F>
where
    I: Iterator,
    F: FnMut(&I::Item) -> usize,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Vec<I::Item>> {
        let mut batch = Vec::new();
        let mut accumulated = 0usize;

        while let Some(item) = self.carry.take().or_else(|| self.items.next()) {
            let cost = (self.cost_fn)(&item);
            if accumulated + cost > self.max_budget && !batch.is_empty() {
                self.carry = Some(item);
                return Some(batch);
            }
            accumulated += cost;
            batch.push(item);
        }

        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}
