/*!
 * Translation service for document translation using AI providers.
 *
 * - `service`: history-aware streaming translation facade over a provider
 * - `memory`: sqlite-backed reuse of previously validated translations
 */

pub use self::memory::TranslationMemory;
pub use self::service::TranslationService;

pub mod memory;
pub mod service;
