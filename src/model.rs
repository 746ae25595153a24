use crate::permissions::Permissoes;
use crate::table::{Record, SearchTerm, Value, split_path};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Currency every invoice is recorded in
pub const MOEDA_PADRAO: &str = "AOA";

/// Status ids from this one upwards count as approved (Aprovada, Rejeitada, Paga)
pub const STATUS_APROVADA: u64 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusFactura {
    pub id: u64,
    pub nome: String,
    pub cor: String,
    pub descricao: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoriaFactura {
    pub id: u64,
    pub nome: String,
    pub codigo: String,
    pub descricao: String,
    pub ativo: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Departamento {
    pub id: u64,
    pub nome: String,
    pub codigo: String,
    pub orcamento_mensal: f64,
    pub responsavel_id: u64,
    pub ativo: bool,
}

/// Access level (role) with its permission matrix
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NivelAcesso {
    pub id: u64,
    pub nome: String,
    pub descricao: String,
    pub permissoes: Permissoes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub nome: String,
    pub email: String,
    pub nivel_acesso_id: u64,
    pub departamento_id: u64,
    pub nivel_acesso: NivelAcesso,
    pub departamento: Departamento,
    pub data_criacao: DateTime<Utc>,
    pub data_ultima_sessao: Option<DateTime<Utc>>,
    pub ativo: bool,
    pub foto_perfil: Option<String>,
}

impl User {
    pub fn permissoes(&self) -> &Permissoes {
        &self.nivel_acesso.permissoes
    }

    /// Up to two initials, shown when there is no profile picture
    pub fn initials(&self) -> String {
        self.nome
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factura {
    pub id: u64,
    pub numero_factura: String,
    pub fornecedor: String,
    pub descricao: String,
    pub valor: f64,
    pub moeda: String,
    pub data_factura: NaiveDate,
    pub data_vencimento: Option<NaiveDate>,
    pub categoria_id: u64,
    pub departamento_id: u64,
    pub status_id: u64,
    pub submissao_usuario_id: u64,
    pub aprovacao_usuario_id: Option<u64>,
    pub data_submissao: DateTime<Utc>,
    pub data_aprovacao: Option<DateTime<Utc>>,
    pub arquivo_caminho: Option<String>,
    pub observacoes: Option<String>,
    pub categoria: CategoriaFactura,
    pub departamento: Departamento,
    pub status: StatusFactura,
    pub usuario_submissao: User,
}

impl Factura {
    pub fn is_pending(&self) -> bool {
        self.status_id == 1 || self.status_id == 2
    }

    pub fn is_approved(&self) -> bool {
        self.status_id >= STATUS_APROVADA
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Factura,
    Info,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub related_id: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u64,
    pub sender_id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: u64,
    pub participant_ids: Vec<u64>,
    pub messages: Vec<Message>,
    pub unread_count: u32,
}

impl Record for StatusFactura {
    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(self.id.into()),
            "nome" => Some(self.nome.as_str().into()),
            "cor" => Some(self.cor.as_str().into()),
            "descricao" => Some(self.descricao.as_str().into()),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        term.matches_value(self.id)
            || term.matches(&self.nome)
            || term.matches(&self.cor)
            || term.matches(&self.descricao)
    }
}

impl Record for CategoriaFactura {
    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(self.id.into()),
            "nome" => Some(self.nome.as_str().into()),
            "codigo" => Some(self.codigo.as_str().into()),
            "descricao" => Some(self.descricao.as_str().into()),
            "ativo" => Some(self.ativo.into()),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        term.matches_value(self.id)
            || term.matches(&self.nome)
            || term.matches(&self.codigo)
            || term.matches(&self.descricao)
            || term.matches_value(self.ativo)
    }
}

impl Record for Departamento {
    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(self.id.into()),
            "nome" => Some(self.nome.as_str().into()),
            "codigo" => Some(self.codigo.as_str().into()),
            "orcamento_mensal" => Some(self.orcamento_mensal.into()),
            "responsavel_id" => Some(self.responsavel_id.into()),
            "ativo" => Some(self.ativo.into()),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        term.matches_value(self.id)
            || term.matches(&self.nome)
            || term.matches(&self.codigo)
            || term.matches_value(self.orcamento_mensal)
            || term.matches_value(self.responsavel_id)
            || term.matches_value(self.ativo)
    }
}

impl Record for NivelAcesso {
    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(self.id.into()),
            "nome" => Some(self.nome.as_str().into()),
            "descricao" => Some(self.descricao.as_str().into()),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        term.matches_value(self.id)
            || term.matches(&self.nome)
            || term.matches(&self.descricao)
            || self.permissoes.matches(term)
    }
}

impl Record for User {
    fn field(&self, path: &str) -> Option<Value> {
        match split_path(path) {
            ("nivel_acesso", Some(rest)) => self.nivel_acesso.field(rest),
            ("departamento", Some(rest)) => self.departamento.field(rest),
            (_, Some(_)) => None,
            ("id", None) => Some(self.id.into()),
            ("nome", None) => Some(self.nome.as_str().into()),
            ("email", None) => Some(self.email.as_str().into()),
            ("nivel_acesso_id", None) => Some(self.nivel_acesso_id.into()),
            ("departamento_id", None) => Some(self.departamento_id.into()),
            ("data_criacao", None) => Some(self.data_criacao.into()),
            ("data_ultima_sessao", None) => self.data_ultima_sessao.map(Value::from),
            ("ativo", None) => Some(self.ativo.into()),
            ("foto_perfil", None) => self.foto_perfil.as_deref().map(Value::from),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        term.matches_value(self.id)
            || term.matches(&self.nome)
            || term.matches(&self.email)
            || term.matches_value(self.nivel_acesso_id)
            || term.matches_value(self.departamento_id)
            || self.nivel_acesso.matches(term)
            || self.departamento.matches(term)
            || term.matches_value(self.data_criacao)
            || term.matches_opt_value(self.data_ultima_sessao)
            || term.matches_value(self.ativo)
            || term.matches_opt(self.foto_perfil.as_deref())
    }
}

impl Record for Factura {
    fn field(&self, path: &str) -> Option<Value> {
        match split_path(path) {
            ("categoria", Some(rest)) => self.categoria.field(rest),
            ("departamento", Some(rest)) => self.departamento.field(rest),
            ("status", Some(rest)) => self.status.field(rest),
            ("usuario_submissao", Some(rest)) => self.usuario_submissao.field(rest),
            (_, Some(_)) => None,
            ("id", None) => Some(self.id.into()),
            ("numero_factura", None) => Some(self.numero_factura.as_str().into()),
            ("fornecedor", None) => Some(self.fornecedor.as_str().into()),
            ("descricao", None) => Some(self.descricao.as_str().into()),
            ("valor", None) => Some(self.valor.into()),
            ("moeda", None) => Some(self.moeda.as_str().into()),
            ("data_factura", None) => Some(self.data_factura.into()),
            ("data_vencimento", None) => self.data_vencimento.map(Value::from),
            ("categoria_id", None) => Some(self.categoria_id.into()),
            ("departamento_id", None) => Some(self.departamento_id.into()),
            ("status_id", None) => Some(self.status_id.into()),
            ("submissao_usuario_id", None) => Some(self.submissao_usuario_id.into()),
            ("aprovacao_usuario_id", None) => self.aprovacao_usuario_id.map(Value::from),
            ("data_submissao", None) => Some(self.data_submissao.into()),
            ("data_aprovacao", None) => self.data_aprovacao.map(Value::from),
            ("arquivo_caminho", None) => self.arquivo_caminho.as_deref().map(Value::from),
            ("observacoes", None) => self.observacoes.as_deref().map(Value::from),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        term.matches_value(self.id)
            || term.matches(&self.numero_factura)
            || term.matches(&self.fornecedor)
            || term.matches(&self.descricao)
            || term.matches_value(self.valor)
            || term.matches(&self.moeda)
            || term.matches_value(self.data_factura)
            || term.matches_opt_value(self.data_vencimento)
            || term.matches_value(self.categoria_id)
            || term.matches_value(self.departamento_id)
            || term.matches_value(self.status_id)
            || term.matches_value(self.submissao_usuario_id)
            || term.matches_opt_value(self.aprovacao_usuario_id)
            || term.matches_value(self.data_submissao)
            || term.matches_opt_value(self.data_aprovacao)
            || term.matches_opt(self.arquivo_caminho.as_deref())
            || term.matches_opt(self.observacoes.as_deref())
            || self.categoria.matches(term)
            || self.departamento.matches(term)
            || self.status.matches(term)
            || self.usuario_submissao.matches(term)
    }
}
