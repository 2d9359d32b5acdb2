/// Utilitários para manipulação segura de strings UTF-8

/// Trunca em no máximo `max_chars` caracteres (não bytes)
///
/// Usado para limitar o corpo das respostas guardado nos registros de envio.
///
/// # Exemplo
/// ```
/// use cdg_producao::utils::string_utils::truncate_chars;
///
/// assert_eq!(truncate_chars("ação", 2), "aç");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Trunca uma string de forma segura, sem cortar no meio de um caractere UTF-8
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Trunca e adiciona um sufixo (como "...") quando houve corte
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    let truncated = truncate_safe(s, max_bytes);
    if truncated.len() < s.len() {
        format!("{}{}", truncated, suffix)
    } else {
        truncated.to_string()
    }
}

/// Normaliza campos de texto opcionais: espaços nas pontas removidos, vazio vira `None`
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
