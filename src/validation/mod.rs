/*!
 * Structural validation of translator responses.
 *
 * Before any translated text is allowed near the anchor codec, the response
 * has to prove it still carries the group frame and every per-position block
 * delimiter it was sent with. Anything less and the whole group is flagged
 * for manual review instead of being spliced back.
 */

pub use self::response::{validate_and_parse, ResponseValidation};

pub mod response;
