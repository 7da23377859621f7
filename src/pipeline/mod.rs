//! Pipeline stages for PDF auto-tagging.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own. Only [`extract`] touches the filesystem and only [`llm`] touches the
//! network; everything in between is pure.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ analyze ──▶ summary ──▶ llm ──▶ resolve ──▶ normalize
//! (lopdf)     (regex)     (≤2000ch)   (HTTP)  (fallbacks)  (≤5 tags)
//! ```
//!
//! 1. [`extract`]: text layer, page count and `/Info` metadata; runs in
//!    `spawn_blocking` because parsing is CPU-bound
//! 2. [`analyze`]: headings, entities, keywords and a document-type label
//! 3. [`summary`]: compress the above into labeled sections for the prompt
//! 4. [`llm`]: one chat-completion call; the only stage with network I/O
//! 5. [`resolve`]: dig the candidate JSON out of the reply, tolerating
//!    fences, prose and reasoning-only answers
//! 6. [`normalize`]: lower-case, bound and deduplicate the candidates
//!
//! The prompt between steps 3 and 4 comes from [`crate::prompts`].

pub mod analyze;
pub mod extract;
pub mod llm;
pub mod normalize;
pub mod resolve;
pub mod summary;
