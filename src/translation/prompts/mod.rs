/*!
 * Prompt construction for every task kind.
 *
 * This module provides:
 * - Fixed prompt texts for the translate and line-fix tasks
 * - Model-specific placement of the system prompt
 */

pub mod templates;

// Re-export main types
pub use templates::{PayloadBuilder, PromptTemplate};
