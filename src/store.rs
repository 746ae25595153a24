//! In-process data store behind every screen of the dashboard.
//!
//! The store owns every entity list and is the only place they change. New
//! records go to the front of their list, which is the order list views show
//! before any sort is requested. Invoices and users embed copies of the
//! entities they reference; the store refreshes those copies whenever the
//! referenced entity changes.

use crate::error::StoreError;
use crate::format::format_currency;
use crate::forms::{CategoriaForm, FacturaForm, PerfilForm, UsuarioForm};
use crate::messaging::Inbox;
use crate::model::{
    CategoriaFactura, Departamento, Factura, MOEDA_PADRAO, NivelAcesso, Notification,
    NotificationKind, STATUS_APROVADA, StatusFactura, User,
};
use crate::permissions::Permissoes;
use crate::seed::{
    CATEGORIAS_FACTURAS, DEPARTAMENTOS, NIVEIS_ACESSO, STATUS_FACTURAS, SeedGenerator, admin_user,
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataStore {
    facturas: Vec<Factura>,
    users: Vec<User>,
    categorias: Vec<CategoriaFactura>,
    departamentos: Vec<Departamento>,
    niveis_acesso: Vec<NivelAcesso>,
    statuses: Vec<StatusFactura>,
    notifications: Vec<Notification>,
    inboxes: HashMap<u64, Inbox>,
    next_id: u64,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    /// Store holding the fixed catalogs and the administrator, nothing else
    pub fn new() -> Self {
        Self::from_parts(vec![admin_user(Utc::now())], Vec::new())
    }

    /// Store filled with `users` generated users and `facturas` generated invoices
    pub fn seeded(generator: &mut SeedGenerator, facturas: usize, users: usize) -> Self {
        let generated = generator.generate_users(users);
        let mut all_users = vec![admin_user(generator.now())];
        all_users.extend(generated.iter().cloned());

        let submitters = if generated.is_empty() {
            &all_users[..]
        } else {
            &generated[..]
        };
        let facturas = generator.generate_facturas(facturas, submitters);

        info!(
            "seeded store with {} users and {} invoices",
            all_users.len(),
            facturas.len()
        );
        Self::from_parts(all_users, facturas)
    }

    fn from_parts(users: Vec<User>, facturas: Vec<Factura>) -> Self {
        let mut store = DataStore {
            facturas,
            users,
            categorias: CATEGORIAS_FACTURAS.clone(),
            departamentos: DEPARTAMENTOS.clone(),
            niveis_acesso: NIVEIS_ACESSO.clone(),
            statuses: STATUS_FACTURAS.clone(),
            notifications: Vec::new(),
            inboxes: HashMap::new(),
            next_id: 0,
        };
        store.next_id = store.max_id() + 1;
        store
    }

    fn max_id(&self) -> u64 {
        let facturas = self.facturas.iter().map(|f| f.id);
        let users = self.users.iter().map(|u| u.id);
        let categorias = self.categorias.iter().map(|c| c.id);
        let notifications = self.notifications.iter().map(|n| n.id);
        facturas
            .chain(users)
            .chain(categorias)
            .chain(notifications)
            .max()
            .unwrap_or(0)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn facturas(&self) -> &[Factura] {
        &self.facturas
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn categorias(&self) -> &[CategoriaFactura] {
        &self.categorias
    }

    pub fn departamentos(&self) -> &[Departamento] {
        &self.departamentos
    }

    pub fn niveis_acesso(&self) -> &[NivelAcesso] {
        &self.niveis_acesso
    }

    pub fn statuses(&self) -> &[StatusFactura] {
        &self.statuses
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Conversations of `user_id`, `None` until they are first generated
    pub fn inbox(&self, user_id: u64) -> Option<&Inbox> {
        self.inboxes.get(&user_id)
    }

    /// Conversations of `user_id`, starting empty when there are none yet
    pub fn inbox_mut(&mut self, user_id: u64) -> &mut Inbox {
        self.inboxes.entry(user_id).or_default()
    }

    /// Regenerates the conversations shown to `current`
    pub fn refresh_conversations(&mut self, current: &User, generator: &mut SeedGenerator) {
        let conversations = generator.generate_conversations(current, &self.users);
        self.inboxes.insert(current.id, Inbox::new(conversations));
    }

    pub fn factura(&self, id: u64) -> Option<&Factura> {
        self.facturas.iter().find(|f| f.id == id)
    }

    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Emails compare case-insensitively
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn categoria(&self, id: u64) -> Option<&CategoriaFactura> {
        self.categorias.iter().find(|c| c.id == id)
    }

    fn resolve_categoria(&self, id: u64) -> Result<CategoriaFactura, StoreError> {
        self.categoria(id)
            .cloned()
            .ok_or(StoreError::UnknownReference {
                entity: "categoria",
                id,
            })
    }

    fn resolve_departamento(&self, id: u64) -> Result<Departamento, StoreError> {
        self.departamentos
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(StoreError::UnknownReference {
                entity: "departamento",
                id,
            })
    }

    fn resolve_status(&self, id: u64) -> Result<StatusFactura, StoreError> {
        self.statuses
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StoreError::UnknownReference {
                entity: "status",
                id,
            })
    }

    fn resolve_nivel_acesso(&self, id: u64) -> Result<NivelAcesso, StoreError> {
        self.niveis_acesso
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(StoreError::UnknownReference {
                entity: "nível de acesso",
                id,
            })
    }

    fn factura_index(&self, id: u64) -> Result<usize, StoreError> {
        self.facturas
            .iter()
            .position(|f| f.id == id)
            .ok_or(StoreError::NotFound {
                entity: "fatura",
                id,
            })
    }

    fn user_index(&self, id: u64) -> Result<usize, StoreError> {
        self.users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound {
                entity: "utilizador",
                id,
            })
    }

    fn categoria_index(&self, id: u64) -> Result<usize, StoreError> {
        self.categorias
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::NotFound {
                entity: "categoria",
                id,
            })
    }

    fn push_notification(
        &mut self,
        title: &str,
        description: String,
        kind: NotificationKind,
        related_id: Option<u64>,
    ) {
        let id = self.allocate_id();
        self.notifications.insert(
            0,
            Notification {
                id,
                title: title.to_string(),
                description,
                date: Utc::now(),
                kind,
                related_id,
            },
        );
    }

    /// Records a new invoice submitted by `submitter`
    ///
    /// Rejects invalid forms, invoice numbers already in use and references
    /// to unknown categories, departments or statuses. A notification
    /// announcing the invoice is queued on success.
    pub fn add_factura(
        &mut self,
        form: FacturaForm,
        submitter: &User,
    ) -> Result<&Factura, StoreError> {
        form.validate()?;
        if self
            .facturas
            .iter()
            .any(|f| f.numero_factura == form.numero_factura)
        {
            return Err(StoreError::DuplicateInvoiceNumber(form.numero_factura));
        }

        let categoria = self.resolve_categoria(form.categoria_id)?;
        let departamento = self.resolve_departamento(form.departamento_id)?;
        let status = self.resolve_status(form.status_id)?;
        let now = Utc::now();
        let approved = status.id >= STATUS_APROVADA;
        let id = self.allocate_id();

        let factura = Factura {
            id,
            numero_factura: form.numero_factura,
            fornecedor: form.fornecedor,
            descricao: form.descricao,
            valor: form.valor,
            moeda: MOEDA_PADRAO.to_string(),
            data_factura: form.data_factura.unwrap_or_else(|| now.date_naive()),
            data_vencimento: form.data_vencimento,
            categoria_id: categoria.id,
            departamento_id: departamento.id,
            status_id: status.id,
            submissao_usuario_id: submitter.id,
            aprovacao_usuario_id: if approved { Some(submitter.id) } else { None },
            data_submissao: now,
            data_aprovacao: if approved { Some(now) } else { None },
            arquivo_caminho: form.arquivo_caminho,
            observacoes: form.observacoes,
            categoria,
            departamento,
            status,
            usuario_submissao: submitter.clone(),
        };

        let description = format!(
            "Fatura {} de {} foi adicionada.",
            factura.numero_factura,
            format_currency(factura.valor, &factura.moeda)
        );
        info!(
            "invoice {} ({}) added by user {}",
            id, factura.numero_factura, submitter.id
        );
        self.facturas.insert(0, factura);
        self.push_notification(
            "Nova Fatura Submetida",
            description,
            NotificationKind::Factura,
            Some(id),
        );

        Ok(&self.facturas[0])
    }

    /// Replaces the editable fields of an invoice
    ///
    /// Submitter and submission time are preserved; the invoice number may not
    /// collide with another invoice. A status change is stamped the same way
    /// as through [`DataStore::set_factura_status`], with `editor` as approver.
    pub fn update_factura(
        &mut self,
        id: u64,
        form: FacturaForm,
        editor: &User,
    ) -> Result<&Factura, StoreError> {
        form.validate()?;
        let index = self.factura_index(id)?;
        if self
            .facturas
            .iter()
            .any(|f| f.id != id && f.numero_factura == form.numero_factura)
        {
            return Err(StoreError::DuplicateInvoiceNumber(form.numero_factura));
        }

        let categoria = self.resolve_categoria(form.categoria_id)?;
        let departamento = self.resolve_departamento(form.departamento_id)?;
        let status = self.resolve_status(form.status_id)?;

        let factura = &mut self.facturas[index];
        record_approval(factura, status.id, editor);
        factura.numero_factura = form.numero_factura;
        factura.fornecedor = form.fornecedor;
        factura.descricao = form.descricao;
        factura.valor = form.valor;
        if let Some(data) = form.data_factura {
            factura.data_factura = data;
        }
        factura.data_vencimento = form.data_vencimento;
        factura.categoria_id = categoria.id;
        factura.departamento_id = departamento.id;
        factura.status_id = status.id;
        factura.arquivo_caminho = form.arquivo_caminho;
        factura.observacoes = form.observacoes;
        factura.categoria = categoria;
        factura.departamento = departamento;
        factura.status = status;
        debug!("invoice {} updated", id);

        Ok(&self.facturas[index])
    }

    /// Moves an invoice to another status
    ///
    /// Entering an approved state records `actor` as approver and stamps the
    /// approval time once; leaving it clears both.
    pub fn set_factura_status(
        &mut self,
        id: u64,
        status_id: u64,
        actor: &User,
    ) -> Result<&Factura, StoreError> {
        let index = self.factura_index(id)?;
        let status = self.resolve_status(status_id)?;
        let nome = status.nome.clone();

        let factura = &mut self.facturas[index];
        record_approval(factura, status.id, actor);
        factura.status_id = status.id;
        factura.status = status;
        let description = format!("Fatura {} passou para {}.", factura.numero_factura, nome);

        info!("invoice {} moved to status {} by user {}", id, status_id, actor.id);
        self.push_notification(
            "Estado da Fatura",
            description,
            NotificationKind::Info,
            Some(id),
        );
        Ok(&self.facturas[index])
    }

    pub fn delete_factura(&mut self, id: u64) -> Result<Factura, StoreError> {
        let index = self.factura_index(id)?;
        info!("invoice {} deleted", id);
        Ok(self.facturas.remove(index))
    }

    pub fn add_user(&mut self, form: UsuarioForm) -> Result<&User, StoreError> {
        form.validate(false)?;
        if self.user_by_email(&form.email).is_some() {
            return Err(StoreError::DuplicateEmail(form.email));
        }
        let departamento = self.resolve_departamento(form.departamento_id)?;
        let nivel_acesso = self.resolve_nivel_acesso(form.nivel_acesso_id)?;
        let id = self.allocate_id();

        let user = User {
            id,
            nome: form.nome,
            email: form.email.trim().to_string(),
            nivel_acesso_id: nivel_acesso.id,
            departamento_id: departamento.id,
            nivel_acesso,
            departamento,
            data_criacao: Utc::now(),
            data_ultima_sessao: None,
            ativo: form.ativo,
            foto_perfil: form.foto_perfil,
        };
        info!("user {} ({}) added", id, user.email);
        self.users.insert(0, user);
        Ok(&self.users[0])
    }

    /// Applies the user form to an existing account
    ///
    /// The access level is only re-read from the catalog when it changes, so
    /// permissions customised for this user survive an unrelated edit.
    pub fn update_user(&mut self, id: u64, form: UsuarioForm) -> Result<&User, StoreError> {
        form.validate(true)?;
        let index = self.user_index(id)?;
        if self
            .user_by_email(&form.email)
            .is_some_and(|other| other.id != id)
        {
            return Err(StoreError::DuplicateEmail(form.email));
        }
        let departamento = self.resolve_departamento(form.departamento_id)?;
        let nivel_acesso = if self.users[index].nivel_acesso_id == form.nivel_acesso_id {
            self.users[index].nivel_acesso.clone()
        } else {
            self.resolve_nivel_acesso(form.nivel_acesso_id)?
        };

        let user = &mut self.users[index];
        user.nome = form.nome;
        user.email = form.email.trim().to_string();
        user.ativo = form.ativo;
        if form.foto_perfil.is_some() {
            user.foto_perfil = form.foto_perfil;
        }
        user.nivel_acesso_id = nivel_acesso.id;
        user.nivel_acesso = nivel_acesso;
        user.departamento_id = departamento.id;
        user.departamento = departamento;
        debug!("user {} updated", id);

        self.sync_submitter(index);
        Ok(&self.users[index])
    }

    /// Profile page update of the logged-in user
    pub fn update_profile(&mut self, id: u64, form: PerfilForm) -> Result<&User, StoreError> {
        form.validate()?;
        let index = self.user_index(id)?;
        if self
            .user_by_email(&form.email)
            .is_some_and(|other| other.id != id)
        {
            return Err(StoreError::DuplicateEmail(form.email));
        }

        let user = &mut self.users[index];
        user.nome = form.nome;
        user.email = form.email.trim().to_string();
        if form.foto_perfil.is_some() {
            user.foto_perfil = form.foto_perfil;
        }

        self.sync_submitter(index);
        Ok(&self.users[index])
    }

    /// Replaces the permission matrix of one user without touching the catalog
    pub fn update_permissions(
        &mut self,
        user_id: u64,
        permissoes: Permissoes,
    ) -> Result<&User, StoreError> {
        let index = self.user_index(user_id)?;
        self.users[index].nivel_acesso.permissoes = permissoes;
        info!("permissions of user {} changed", user_id);
        self.sync_submitter(index);
        Ok(&self.users[index])
    }

    /// Stamps the last login time
    pub fn touch_last_session(
        &mut self,
        user_id: u64,
        when: DateTime<Utc>,
    ) -> Result<&User, StoreError> {
        let index = self.user_index(user_id)?;
        self.users[index].data_ultima_sessao = Some(when);
        Ok(&self.users[index])
    }

    pub fn delete_user(&mut self, id: u64) -> Result<User, StoreError> {
        let index = self.user_index(id)?;
        self.inboxes.remove(&id);
        info!("user {} deleted", id);
        Ok(self.users.remove(index))
    }

    fn sync_submitter(&mut self, user_index: usize) {
        let user = &self.users[user_index];
        for factura in self
            .facturas
            .iter_mut()
            .filter(|f| f.submissao_usuario_id == user.id)
        {
            factura.usuario_submissao = user.clone();
        }
    }

    pub fn add_categoria(&mut self, form: CategoriaForm) -> Result<&CategoriaFactura, StoreError> {
        form.validate()?;
        let id = self.allocate_id();
        self.categorias.insert(
            0,
            CategoriaFactura {
                id,
                nome: form.nome,
                codigo: form.codigo,
                descricao: form.descricao,
                ativo: form.ativo,
            },
        );
        info!("category {} added", id);
        Ok(&self.categorias[0])
    }

    pub fn update_categoria(
        &mut self,
        id: u64,
        form: CategoriaForm,
    ) -> Result<&CategoriaFactura, StoreError> {
        form.validate()?;
        let index = self.categoria_index(id)?;

        let categoria = &mut self.categorias[index];
        categoria.nome = form.nome;
        categoria.codigo = form.codigo;
        categoria.descricao = form.descricao;
        categoria.ativo = form.ativo;

        let updated = categoria.clone();
        for factura in self.facturas.iter_mut().filter(|f| f.categoria_id == id) {
            factura.categoria = updated.clone();
        }
        debug!("category {} updated", id);
        Ok(&self.categorias[index])
    }

    /// Removes a category; invoices keep their embedded copy
    pub fn delete_categoria(&mut self, id: u64) -> Result<CategoriaFactura, StoreError> {
        let index = self.categoria_index(id)?;
        info!("category {} deleted", id);
        Ok(self.categorias.remove(index))
    }
}

/// Approved states keep the first approver and time; earlier states clear them
fn record_approval(factura: &mut Factura, status_id: u64, actor: &User) {
    if status_id >= STATUS_APROVADA {
        if factura.data_aprovacao.is_none() {
            factura.aprovacao_usuario_id = Some(actor.id);
            factura.data_aprovacao = Some(Utc::now());
        }
    } else {
        factura.aprovacao_usuario_id = None;
        factura.data_aprovacao = None;
    }
}
