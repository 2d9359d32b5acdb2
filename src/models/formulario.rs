use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marcas (clientes) que enviam formulários de impressão
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marca {
    ZeroHum,
    Pensi,
    Elite,
    Coleguium,
}

impl Marca {
    pub const TODAS: [Marca; 4] = [Marca::ZeroHum, Marca::Pensi, Marca::Elite, Marca::Coleguium];

    /// Segmento da URL e valor gravado em `formulario.marca`
    pub fn slug(&self) -> &'static str {
        match self {
            Marca::ZeroHum => "zerohum",
            Marca::Pensi => "pensi",
            Marca::Elite => "elite",
            Marca::Coleguium => "coleguium",
        }
    }

    /// Nome da pasta no Google Drive (também usado no nome do PDF)
    pub fn pasta(&self) -> &'static str {
        match self {
            Marca::ZeroHum => "ZeroHum",
            Marca::Pensi => "Pensi",
            Marca::Elite => "Elite",
            Marca::Coleguium => "coleguium",
        }
    }

    /// Prefixo do código de operação
    pub fn prefixo(&self) -> &'static str {
        match self {
            Marca::ZeroHum => "ZH",
            Marca::Pensi => "PS",
            Marca::Elite => "EL",
            Marca::Coleguium => "CL",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::TODAS
            .into_iter()
            .find(|m| m.slug().eq_ignore_ascii_case(slug))
    }
}

impl fmt::Display for Marca {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pasta())
    }
}

pub const FORMATOS: [&str; 6] = ["A4", "A5", "A3", "CARTA", "OFICIO", "OUTRO"];
pub const CORES_IMPRESSAO: [&str; 2] = ["PB", "COLOR"];
pub const TIPOS_IMPRESSAO: [&str; 3] = ["1_LADO", "2_LADOS", "LIVRETO"];

pub const FORMATO_PADRAO: &str = "A4";
pub const COR_PADRAO: &str = "PB";
pub const IMPRESSAO_PADRAO: &str = "1_LADO";

/// Unidades escolares aceitas em `Unidade.nome`
pub const UNIDADES: [&str; 27] = [
    "ARARUAMA",
    "CABO_FRIO",
    "ITABORAI",
    "ITAIPUACU",
    "MARICA_I",
    "NOVA_FRIBURGO",
    "QUEIMADOS",
    "SEROPEDICA",
    "ALCANTARA",
    "BANGU",
    "BARRA_DA_TIJUCA",
    "BELFORD_ROXO",
    "DUQUE_DE_CAXIAS",
    "ICARAI",
    "ILHA_DO_GOVERNADOR",
    "ITAIPU",
    "MADUREIRA",
    "MEIER",
    "NILOPOLIS",
    "NITEROI",
    "NOVA_IGUACU",
    "OLARIA",
    "PRATA",
    "SAO_GONCALO",
    "SAO_JOAO_DE_MERITI",
    "VILA_ISABEL",
    "VILAR_DOS_TELES",
];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Formulario {
    pub id: i64,
    pub marca: String,
    pub nome: String,
    pub email: String,
    pub unidade_nome: String,
    pub unidade_quantidade: Option<i32>,
    pub titulo: String,
    pub data_entrega: NaiveDate,
    pub observacoes: String,
    pub formato: String,
    pub cor_impressao: String,
    pub impressao: String,
    pub cod_op: String,
    pub link_download: Option<String>,
    pub web_view_link: Option<String>,
    pub json_link: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
    #[sqlx(skip)]
    pub unidades: Vec<Unidade>,
    #[sqlx(skip)]
    pub arquivos: Vec<ArquivoPdf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Unidade {
    pub id: i64,
    pub formulario_id: i64,
    pub nome: String,
    pub quantidade: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NovaUnidade {
    pub nome: String,
    #[serde(default = "quantidade_padrao")]
    pub quantidade: i32,
}

fn quantidade_padrao() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ArquivoPdf {
    pub id: i64,
    pub formulario_id: i64,
    pub nome: String,
    pub link_download: Option<String>,
    pub web_view_link: Option<String>,
    pub json_link: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NovoArquivo {
    pub nome: String,
    pub link_download: Option<String>,
    pub web_view_link: Option<String>,
    pub json_link: Option<String>,
}

/// Dados validados de um formulário novo
#[derive(Debug, Clone, PartialEq)]
pub struct NovoFormulario {
    pub marca: Marca,
    pub nome: String,
    pub email: String,
    pub unidade_nome: String,
    pub unidade_quantidade: Option<i32>,
    pub titulo: String,
    pub data_entrega: NaiveDate,
    pub observacoes: String,
    pub formato: String,
    pub cor_impressao: String,
    pub impressao: String,
    pub unidades: Vec<NovaUnidade>,
}

/// Campos enviados pelos front-ends (JSON ou multipart), antes da validação
///
/// Campos somente leitura (`cod_op`, links, datas de controle) não existem
/// aqui e por isso são ignorados se vierem no corpo.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormularioEntrada {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub unidade_nome: Option<String>,
    pub unidade_quantidade: Option<i32>,
    pub titulo: Option<String>,
    pub data_entrega: Option<String>,
    pub observacoes: Option<String>,
    pub formato: Option<String>,
    pub cor_impressao: Option<String>,
    pub impressao: Option<String>,
    pub unidades: Option<Vec<NovaUnidade>>,
}

/// Atualização parcial já validada
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormularioPatch {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub unidade_nome: Option<String>,
    pub unidade_quantidade: Option<i32>,
    pub titulo: Option<String>,
    pub data_entrega: Option<NaiveDate>,
    pub observacoes: Option<String>,
    pub formato: Option<String>,
    pub cor_impressao: Option<String>,
    pub impressao: Option<String>,
    pub unidades: Option<Vec<NovaUnidade>>,
}

/// Links do PDF principal gravados no formulário
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinksFormulario {
    pub link_download: Option<String>,
    pub web_view_link: Option<String>,
    pub json_link: Option<String>,
}
