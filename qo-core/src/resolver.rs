//! Fill-the-gaps merge of invocation parameters with the configuration store
//!
//! Each configurable field is one row in [`FILL_RULES`]: a name, the parameter slot,
//! and the configuration slot it falls back to. A row only ever writes to a slot that
//! is still empty, so caller-supplied values always win and resolving twice is a no-op.

use crate::config::KeygenConfig;
use crate::params::KeygenParameters;
use crate::secret::SecretBytes;
use tracing::debug;

/// Value that can be "not yet provided"
pub trait Unset {
    fn is_unset(&self) -> bool;
}

impl Unset for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl Unset for SecretBytes {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Unset for Option<T> {
    fn is_unset(&self) -> bool {
        self.is_none()
    }
}

/// One `(target, fallback)` pair
pub struct FillRule {
    pub field: &'static str,
    apply: fn(&mut KeygenParameters, &KeygenConfig) -> bool,
}

impl FillRule {
    /// Returns true when the fallback was taken
    pub fn apply(&self, params: &mut KeygenParameters, config: &KeygenConfig) -> bool {
        (self.apply)(params, config)
    }
}

/// Copy `fallback` into `target` when `target` is unset and `fallback` is not
fn fill<T: Unset + Clone>(target: &mut T, fallback: &T) -> bool {
    if target.is_unset() && !fallback.is_unset() {
        *target = fallback.clone();
        true
    } else {
        false
    }
}

macro_rules! fill_rules {
    ($($field:literal => $($target:ident).+ <- $section:ident . $source:ident;)+) => {
        &[$(FillRule {
            field: $field,
            apply: |params, config| fill(&mut params.$($target).+, &config.$section().$source),
        }),+]
    };
}

/// Field precedence table: parameter slot <- configuration slot
pub const FILL_RULES: &[FillRule] = fill_rules! {
    "cert" => api.auth.client_certificate_filename <- credentials.certificate;
    "privateKeyForCert" => api.auth.private_key_filename <- credentials.private_key_for_cert;
    "keyType" => key_type <- key_parameters.key_type;
    "keyAlgorithm" => key_algorithm <- key_parameters.key_algorithm;
    "keyParameters" => key_parameters.json <- key_parameters.key_parameters;
    "url" => api.url <- credentials.url;
    "nonce" => decryption.nonce <- key_parameters.nonce;
    "outputFormat" => output.format <- general.output_format;
    "outputFilename" => output.filename <- general.output_filename;
    "sharedSecret" => decryption.shared_secret <- key_parameters.shared_secret;
    "apiKey" => api.auth.api_key <- credentials.api_key;
    "clientId" => api.auth.client_id <- credentials.client_id;
};

/// Fill every empty parameter from `config`. Without a config, `params` is untouched.
pub fn resolve(params: &mut KeygenParameters, config: Option<&KeygenConfig>) {
    let Some(config) = config else {
        debug!("No configuration supplied, using invocation parameters only");
        return;
    };

    for rule in FILL_RULES {
        if rule.apply(params, config) {
            debug!("{} taken from configuration", rule.field);
        }
    }
}
