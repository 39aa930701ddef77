// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the system.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// One labelled line of a manifest file
pub mod manifest_entry;

// The outcome of classifying one image
pub mod prediction;

// Core abstractions (traits) that other layers implement
pub mod traits;
