//! Fixed catalogs and synthetic data generation.
//!
//! Statuses, categories, departments and access levels are constant catalogs.
//! Users, invoices and conversations are generated from a seedable RNG so a
//! given seed always produces the same dataset.

use crate::model::{
    CategoriaFactura, Conversation, Departamento, Factura, MOEDA_PADRAO, Message, MessageKind,
    NivelAcesso, STATUS_APROVADA, StatusFactura, User,
};
use crate::permissions::{
    Escopo, EscopoAprovacao, EscopoUsuarios, Permissoes, PermissoesCategorias,
    PermissoesConfiguracoes, PermissoesFacturas, PermissoesRelatorios, PermissoesUsuarios,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Id of the built-in administrator account
pub const ADMIN_ID: u64 = 1;
pub const ADMIN_EMAIL: &str = "admin@empresa.com";
pub const ADMIN_PASSWORD: &str = "admin123";

fn status(id: u64, nome: &str, cor: &str, descricao: &str) -> StatusFactura {
    StatusFactura {
        id,
        nome: nome.to_string(),
        cor: cor.to_string(),
        descricao: descricao.to_string(),
    }
}

fn categoria(id: u64, nome: &str, codigo: &str, descricao: &str) -> CategoriaFactura {
    CategoriaFactura {
        id,
        nome: nome.to_string(),
        codigo: codigo.to_string(),
        descricao: descricao.to_string(),
        ativo: true,
    }
}

fn departamento(id: u64, nome: &str, codigo: &str, orcamento_mensal: f64) -> Departamento {
    Departamento {
        id,
        nome: nome.to_string(),
        codigo: codigo.to_string(),
        orcamento_mensal,
        responsavel_id: ADMIN_ID,
        ativo: true,
    }
}

#[allow(clippy::too_many_arguments)]
fn permissoes(
    criar: bool,
    editar: Escopo,
    aprovar: EscopoAprovacao,
    visualizar: Escopo,
    excluir: bool,
    relatorios: (bool, bool, bool),
    usuarios: (bool, bool, EscopoUsuarios, bool),
    configuracoes: bool,
    categorias: bool,
) -> Permissoes {
    Permissoes {
        facturas: PermissoesFacturas {
            criar,
            editar,
            aprovar,
            visualizar,
            excluir,
        },
        relatorios: PermissoesRelatorios {
            departamento: relatorios.0,
            globais: relatorios.1,
            exportar: relatorios.2,
        },
        usuarios: PermissoesUsuarios {
            criar: usuarios.0,
            editar: usuarios.1,
            visualizar: usuarios.2,
            gerir_permissoes: usuarios.3,
        },
        configuracoes: PermissoesConfiguracoes {
            acessar: configuracoes,
        },
        categorias: PermissoesCategorias { gerir: categorias },
    }
}

lazy_static! {
    pub static ref STATUS_FACTURAS: Vec<StatusFactura> = vec![
        status(1, "Submetida", "#3B82F6", "Factura submetida aguardando análise"),
        status(2, "Em Análise", "#F59E0B", "Factura em processo de análise"),
        status(3, "Aprovada", "#10B981", "Factura aprovada para pagamento"),
        status(4, "Rejeitada", "#EF4444", "Factura rejeitada"),
        status(5, "Paga", "#8B5CF6", "Factura paga"),
    ];

    pub static ref CATEGORIAS_FACTURAS: Vec<CategoriaFactura> = vec![
        categoria(1, "Material de Escritório", "MAT_ESC", "Materiais para escritório"),
        categoria(2, "Equipamentos de TI", "EQUIP_TI", "Equipamentos de tecnologia"),
        categoria(3, "Serviços de Consultoria", "SERV_CONS", "Serviços de consultoria externa"),
        categoria(4, "Manutenção", "MANUT", "Serviços de manutenção"),
        categoria(5, "Combustível", "COMBUST", "Combustível para veículos"),
        categoria(6, "Telecomunicações", "TELECOM", "Serviços de telecomunicações"),
    ];

    pub static ref DEPARTAMENTOS: Vec<Departamento> = vec![
        departamento(1, "Administração", "ADM", 100_000.0),
        departamento(2, "Tecnologia", "TI", 250_000.0),
        departamento(3, "Recursos Humanos", "RH", 80_000.0),
        departamento(4, "Comercial", "COM", 150_000.0),
        departamento(5, "Financeiro", "FIN", 120_000.0),
    ];

    pub static ref NIVEIS_ACESSO: Vec<NivelAcesso> = vec![
        NivelAcesso {
            id: 1,
            nome: "Super Admin".to_string(),
            descricao: "Acesso total".to_string(),
            permissoes: permissoes(
                true, Escopo::Todas, EscopoAprovacao::Todas, Escopo::Todas, true,
                (true, true, true),
                (true, true, EscopoUsuarios::Todos, true),
                true, true,
            ),
        },
        NivelAcesso {
            id: 2,
            nome: "Admin Financeiro".to_string(),
            descricao: "Acesso financeiro".to_string(),
            permissoes: permissoes(
                true, Escopo::Todas, EscopoAprovacao::Todas, Escopo::Todas, false,
                (true, true, true),
                (false, false, EscopoUsuarios::Departamento, false),
                true, true,
            ),
        },
        NivelAcesso {
            id: 3,
            nome: "Gestor de Departamento".to_string(),
            descricao: "Acesso departamental".to_string(),
            permissoes: permissoes(
                true, Escopo::Departamento, EscopoAprovacao::Departamento,
                Escopo::Departamento, false,
                (true, false, true),
                (false, false, EscopoUsuarios::Departamento, false),
                false, false,
            ),
        },
        NivelAcesso {
            id: 4,
            nome: "Funcionário".to_string(),
            descricao: "Acesso básico".to_string(),
            permissoes: permissoes(
                true, Escopo::Proprias, EscopoAprovacao::Nenhuma, Escopo::Proprias, false,
                (false, false, false),
                (false, false, EscopoUsuarios::Proprios, false),
                false, false,
            ),
        },
    ];
}

const FIRST_NAMES: &[&str] = &[
    "Ana", "João", "Maria", "Pedro", "Luísa", "Carlos", "Beatriz", "Manuel", "Isabel", "António",
    "Helena", "Miguel", "Teresa", "Paulo", "Joana", "Ricardo", "Filipa", "Domingos", "Marta",
    "Nelson",
];

const LAST_NAMES: &[&str] = &[
    "Silva", "Santos", "Ferreira", "Pereira", "Costa", "Oliveira", "Rodrigues", "Martins",
    "Sousa", "Gomes", "Lopes", "Marques", "Almeida", "Neto", "Cardoso", "Fernandes",
];

const EMAIL_DOMAINS: &[&str] = &["empresa.com", "mail.ao", "correio.co.ao", "exemplo.org"];

const COMPANY_PREFIXES: &[&str] = &[
    "Atlântico", "Kwanza", "Luanda", "Benguela", "Huíla", "Cunene", "Namibe", "Lobito", "Zaire",
    "Malanje",
];

const COMPANY_SUFFIXES: &[&str] = &[
    "Serviços Lda", "Comércio SA", "Tecnologias", "Distribuição", "Consultores", "Logística",
    "Energia", "Telecom",
];

const PRODUCT_ADJECTIVES: &[&str] = &[
    "Ergonómico", "Robusto", "Compacto", "Premium", "Reciclado", "Inteligente", "Portátil",
];

const PRODUCT_NOUNS: &[&str] = &[
    "conjunto de cadeiras", "portátil", "servidor", "lote de papel", "contrato de suporte",
    "router", "gerador", "serviço de limpeza", "licença de software", "abastecimento de frota",
];

const SENTENCES: &[&str] = &[
    "Podes confirmar o valor desta fatura?",
    "Já enviei o comprovativo ao fornecedor.",
    "A aprovação fica para amanhã de manhã.",
    "Precisamos de rever o orçamento do mês.",
    "O fornecedor pediu o pagamento antecipado.",
    "Falta anexar o documento original.",
    "Obrigado, está tudo em ordem.",
    "Vamos discutir isto na reunião de sexta.",
];

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The administrator account present in every dataset
pub fn admin_user(now: DateTime<Utc>) -> User {
    User {
        id: ADMIN_ID,
        nome: "Administrador".to_string(),
        email: ADMIN_EMAIL.to_string(),
        nivel_acesso_id: 1,
        departamento_id: 1,
        nivel_acesso: NIVEIS_ACESSO[0].clone(),
        departamento: DEPARTAMENTOS[0].clone(),
        data_criacao: Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(now),
        data_ultima_sessao: None,
        ativo: true,
        foto_perfil: Some("https://i.pravatar.cc/150?u=admin".to_string()),
    }
}

/// Deterministic source of synthetic users, invoices and conversations
pub struct SeedGenerator {
    rng: StdRng,
    now: DateTime<Utc>,
}

impl SeedGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_clock(seed, Utc::now())
    }

    /// Generator whose "now" is fixed, for reproducible dates
    pub fn with_clock(seed: u64, now: DateTime<Utc>) -> Self {
        SeedGenerator {
            rng: StdRng::seed_from_u64(seed),
            now,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.gen_range(0..items.len())]
    }

    fn alphanumeric(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| ALPHANUMERIC[self.rng.gen_range(0..ALPHANUMERIC.len())] as char)
            .collect()
    }

    fn recent(&mut self, days: i64) -> DateTime<Utc> {
        self.now - Duration::seconds(self.rng.gen_range(1..days * 86_400))
    }

    fn future(&mut self, days: i64) -> DateTime<Utc> {
        self.now + Duration::seconds(self.rng.gen_range(1..days * 86_400))
    }

    fn between(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> DateTime<Utc> {
        let span = (to - from).num_seconds();
        if span <= 0 {
            return from;
        }
        from + Duration::seconds(self.rng.gen_range(0..=span))
    }

    fn full_name(&mut self) -> String {
        let first = *self.pick(FIRST_NAMES);
        let last = *self.pick(LAST_NAMES);
        format!("{} {}", first, last)
    }

    /// `count` users with ids from 10 upwards; never Super Admin
    pub fn generate_users(&mut self, count: usize) -> Vec<User> {
        (0..count)
            .map(|index| {
                let departamento = self.pick(DEPARTAMENTOS.as_slice()).clone();
                let nivel_acesso = self.pick(&NIVEIS_ACESSO.as_slice()[1..]).clone();
                let nome = self.full_name();
                let domain = *self.pick(EMAIL_DOMAINS);
                let email = format!(
                    "{}.{}@{}",
                    ascii_slug(nome.split_whitespace().next().unwrap_or("user")),
                    index + 10,
                    domain
                );
                let data_criacao = self.recent(365);
                let ativo = self.rng.gen_bool(0.5);
                let id = index as u64 + 10;

                User {
                    id,
                    nome,
                    email,
                    nivel_acesso_id: nivel_acesso.id,
                    departamento_id: departamento.id,
                    nivel_acesso,
                    departamento,
                    data_criacao,
                    data_ultima_sessao: None,
                    ativo,
                    foto_perfil: Some(format!("https://i.pravatar.cc/150?u={}", id)),
                }
            })
            .collect()
    }

    /// `count` invoices with ids from 1 upwards, submitted by users from `submitters`
    ///
    /// Invoices that are approved, rejected or paid get the administrator as
    /// approver and an approval time between submission and now.
    pub fn generate_facturas(&mut self, count: usize, submitters: &[User]) -> Vec<Factura> {
        if submitters.is_empty() {
            return Vec::new();
        }

        (0..count)
            .map(|index| {
                let departamento = self.pick(DEPARTAMENTOS.as_slice()).clone();
                let categoria = self.pick(CATEGORIAS_FACTURAS.as_slice()).clone();
                let status = self.pick(STATUS_FACTURAS.as_slice()).clone();
                let data_submissao = self.recent(90);
                let submissao = self.pick(submitters).clone();
                let approved = status.id >= STATUS_APROVADA;
                let now = self.now;
                let data_aprovacao = if approved {
                    Some(self.between(data_submissao, now))
                } else {
                    None
                };
                let valor = f64::from(self.rng.gen_range(100_000u32..=5_000_000)) / 100.0;
                let fornecedor = format!(
                    "{} {}",
                    self.pick(COMPANY_PREFIXES),
                    self.pick(COMPANY_SUFFIXES)
                );
                let descricao = format!(
                    "{} {}",
                    self.pick(PRODUCT_ADJECTIVES),
                    self.pick(PRODUCT_NOUNS)
                );
                let observacoes = if self.rng.gen_bool(0.5) {
                    Some(self.pick(SENTENCES).to_string())
                } else {
                    None
                };

                Factura {
                    id: index as u64 + 1,
                    numero_factura: format!("FAT-{}", self.alphanumeric(8)),
                    fornecedor,
                    descricao,
                    valor,
                    moeda: MOEDA_PADRAO.to_string(),
                    data_factura: self.recent(30).date_naive(),
                    data_vencimento: Some(self.future(30).date_naive()),
                    categoria_id: categoria.id,
                    departamento_id: departamento.id,
                    status_id: status.id,
                    submissao_usuario_id: submissao.id,
                    aprovacao_usuario_id: if approved { Some(ADMIN_ID) } else { None },
                    data_submissao,
                    data_aprovacao,
                    arquivo_caminho: Some(format!(
                        "/uploads/facturas/{}.pdf",
                        self.alphanumeric(12).to_lowercase()
                    )),
                    observacoes,
                    categoria,
                    departamento,
                    status,
                    usuario_submissao: submissao,
                }
            })
            .collect()
    }

    /// At most five conversations between `current` and the other users,
    /// messages in chronological order
    pub fn generate_conversations(&mut self, current: &User, users: &[User]) -> Vec<Conversation> {
        users
            .iter()
            .filter(|u| u.id != current.id)
            .take(5)
            .enumerate()
            .map(|(index, other)| {
                let count = self.rng.gen_range(5..=15);
                let mut messages: Vec<Message> = (0..count)
                    .map(|msg_index| {
                        let sender_id = if self.rng.gen_bool(0.5) {
                            current.id
                        } else {
                            other.id
                        };
                        Message {
                            id: (msg_index + index * 100) as u64,
                            sender_id,
                            content: self.pick(SENTENCES).to_string(),
                            timestamp: self.recent(7),
                            kind: MessageKind::Text,
                        }
                    })
                    .collect();
                messages.sort_by_key(|m| m.timestamp);

                Conversation {
                    id: index as u64 + 1,
                    participant_ids: vec![current.id, other.id],
                    messages,
                    unread_count: self.rng.gen_range(0..=3),
                }
            })
            .collect()
    }
}

fn ascii_slug(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}
