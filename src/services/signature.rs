//! Verificação HMAC-SHA256 dos webhooks recebidos da Montink

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Headers aceitos para a assinatura, em ordem de preferência
pub const SIGNATURE_HEADERS: [&str; 2] = ["X-Webhook-Signature", "X-Signature"];

/// Calcula a assinatura hex de um corpo
pub fn sign(body: &[u8], secret: &str) -> String {
    // HMAC aceita chave de qualquer tamanho
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// `true` somente se `signature` == HMAC-SHA256(body, secret) em hex
///
/// Aceita o prefixo `sha256=`. Secret ou assinatura vazios nunca validam.
/// A comparação é feita em tempo constante por `verify_slice`.
pub fn verify(body: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    if signature.is_empty() {
        return false;
    }

    let Ok(expected) = hex::decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
