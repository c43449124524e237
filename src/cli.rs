use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDateTime;
use clap::Parser;
use gateway::{
    clients_api::TIME_ISSUED_FORMAT, store::ClientRegistration, Authority, Entity, IamHttpClient,
    RegisteredClient, ScopePolicy, SearchFilter,
};

use crate::{
    account::AccountController,
    app_state::AppState,
    client::{self, ClientController, TokenRevocation},
    config::DashboardConfig,
    format,
    list::ListController,
    mfa::MfaController,
    password::PasswordController,
    policy::PolicyController,
    ActionOutcome, Ui,
};

#[derive(Parser, Debug)]
#[command(name = "iam-dashboard")]
#[command(about = "Administration client for an IAM instance")]
pub struct DashboardCli {
    /// Path of the TOML configuration file
    #[arg(long, default_value = "Config.toml")]
    pub config: PathBuf,
    /// Answer yes to every confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// OAuth clients
    #[command(subcommand)]
    Clients(ClientCommand),
    /// Scope policies
    #[command(subcommand)]
    Policies(PolicyCommand),
    /// User accounts
    #[command(subcommand)]
    Users(UserCommand),
    /// Password recovery
    #[command(subcommand)]
    Password(PasswordCommand),
    /// Number of users, groups and scope policies
    Counts,
}

#[derive(clap::Subcommand, Debug)]
pub enum ClientCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Only clients whose name matches
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        client_id: String,
        /// Use the self-service registration endpoint
        #[arg(long)]
        mine: bool,
    },
    Delete {
        client_id: String,
        #[arg(long)]
        mine: bool,
    },
    Enable {
        client_id: String,
    },
    Disable {
        client_id: String,
    },
    RotateSecret {
        client_id: String,
    },
    RotateRat {
        client_id: String,
    },
    RevokeTokens {
        client_id: String,
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        access: bool,
        /// Only access tokens issued before, i.e 2024-01-31T12:00:00
        #[arg(long, value_parser = parse_issued_before)]
        issued_before: Option<NaiveDateTime>,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum PolicyCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    Delete {
        id: i64,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum UserCommand {
    Show { id: String },
    GrantAdmin { id: String },
    RevokeAdmin { id: String },
    ResetMfa { id: String },
    RequestAup { id: String },
}

#[derive(clap::Subcommand, Debug)]
pub enum PasswordCommand {
    Forgot { email: String },
}

fn parse_issued_before(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, TIME_ISSUED_FORMAT)
        .map_err(|err| format!("expected YYYY-MM-DDTHH:MM:SS: {err}"))
}

/// Wires controllers to the HTTP gateway for one command.
pub struct Dashboard {
    http: IamHttpClient,
    config: DashboardConfig,
    ui: Ui,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, ui: Ui) -> Self {
        let http = IamHttpClient::new(config.base_url.clone(), config.access_token.clone());
        Self { http, config, ui }
    }

    fn client_controller(&self, mine: bool) -> ClientController {
        let http = Arc::new(self.http.clone());
        if mine {
            ClientController::self_service(
                Arc::new(ClientRegistration(self.http.clone())),
                http.clone(),
                http,
                self.ui.clone(),
                RegisteredClient::default(),
            )
        } else {
            ClientController::admin(
                http.clone(),
                http.clone(),
                http,
                self.ui.clone(),
                RegisteredClient::default(),
            )
        }
    }

    fn account_controller(&self, id: &str) -> AccountController {
        let http = Arc::new(self.http.clone());
        AccountController::new(
            http.clone(),
            http.clone(),
            http.clone(),
            http,
            self.ui.clone(),
            id,
        )
    }

    fn app_state(&self) -> Arc<AppState> {
        let http = Arc::new(self.http.clone());
        Arc::new(AppState::new(http.clone(), http))
    }

    pub async fn run(&self, command: Commands) -> ActionOutcome {
        match command {
            Commands::Clients(command) => self.clients(command).await,
            Commands::Policies(command) => self.policies(command).await,
            Commands::Users(command) => self.users(command).await,
            Commands::Password(PasswordCommand::Forgot { email }) => {
                PasswordController::new(Arc::new(self.http.clone()), self.ui.clone())
                    .forgot(&email)
                    .await
            }
            Commands::Counts => self.counts().await,
        }
    }

    async fn clients(&self, command: ClientCommand) -> ActionOutcome {
        match command {
            ClientCommand::List { page, search } => self.list_clients(page, search).await,
            ClientCommand::Show { client_id, mine } => {
                let mut controller = self.client_controller(mine);
                let outcome = controller.edit_mut().load(&client_id).await;
                if outcome.is_done() {
                    print_client(controller.client());
                    if let Some(status) = controller.status_message().await {
                        println!("status:       {status}");
                    }
                }
                outcome
            }
            ClientCommand::Delete { client_id, mine } => {
                let mut controller = self.client_controller(mine);
                match controller.edit_mut().load(&client_id).await {
                    ActionOutcome::Done => controller.edit_mut().delete().await,
                    outcome => outcome,
                }
            }
            ClientCommand::Enable { client_id } => self.set_client_active(&client_id, true).await,
            ClientCommand::Disable { client_id } => {
                self.set_client_active(&client_id, false).await
            }
            ClientCommand::RotateSecret { client_id } => {
                let mut controller = self.client_controller(false);
                match controller.edit_mut().load(&client_id).await {
                    ActionOutcome::Done => controller.rotate_secret().await,
                    outcome => outcome,
                }
            }
            ClientCommand::RotateRat { client_id } => {
                let mut controller = self.client_controller(false);
                match controller.edit_mut().load(&client_id).await {
                    ActionOutcome::Done => controller.rotate_registration_access_token().await,
                    outcome => outcome,
                }
            }
            ClientCommand::RevokeTokens {
                client_id,
                refresh,
                access,
                issued_before,
            } => {
                let selection = TokenRevocation {
                    refresh_tokens: refresh,
                    access_tokens: access,
                    issued_before,
                };
                if selection.is_empty() {
                    self.ui
                        .sink
                        .error("Select --refresh and/or --access tokens to revoke");
                    return ActionOutcome::Cancelled;
                }
                let mut controller = self.client_controller(false);
                match controller.edit_mut().load(&client_id).await {
                    ActionOutcome::Done => controller.revoke_tokens(selection).await,
                    outcome => outcome,
                }
            }
        }
    }

    async fn list_clients(&self, page: u64, search: Option<String>) -> ActionOutcome {
        let http = Arc::new(self.http.clone());
        let mut list: ListController<RegisteredClient> = ListController::new(
            http.clone(),
            http.clone(),
            self.ui.clone(),
            self.config.items_per_page,
        );
        let outcome = match search {
            Some(search) => {
                let outcome = list.set_filter(SearchFilter::new("name", search)).await;
                if outcome.is_done() && page > 1 {
                    list.go_to_page(page).await
                } else {
                    outcome
                }
            }
            None => list.go_to_page(page).await,
        };
        if !outcome.is_done() {
            return outcome;
        }

        for row in list.rows() {
            let scopes = format::split_scopes(row.scope.as_deref().unwrap_or(""), 3).join(" ");
            println!(
                "{:<40} {:<30} {}",
                row.client_id.as_deref().unwrap_or("-"),
                row.display_name(),
                scopes
            );
            if let Some(status) = client::status_message(&*http, row).await {
                println!("    {status}");
            }
        }
        let pager = list.pager();
        println!(
            "page {} of {} ({} {})",
            pager.current_page(),
            pager.page_count(),
            pager.total_results(),
            RegisteredClient::PLURAL
        );
        outcome
    }

    async fn set_client_active(&self, client_id: &str, active: bool) -> ActionOutcome {
        let mut controller = self.client_controller(false);
        let outcome = controller.edit_mut().load(&client_id.to_owned()).await;
        if !outcome.is_done() {
            return outcome;
        }
        if controller.client().active == active {
            let state = if active { "active" } else { "disabled" };
            self.ui.sink.success(&format!(
                "Client '{}' is already {state}.",
                controller.client().display_name()
            ));
            return ActionOutcome::Done;
        }
        controller.toggle_status().await
    }

    async fn policies(&self, command: PolicyCommand) -> ActionOutcome {
        let http = Arc::new(self.http.clone());
        let mut controller = PolicyController::new(
            http.clone(),
            http,
            self.app_state(),
            self.ui.clone(),
            self.config.policies_per_page,
        );
        let outcome = controller.load_all().await;
        if !outcome.is_done() {
            return outcome;
        }
        match command {
            PolicyCommand::List { page } => {
                controller.go_to_page(page);
                for policy in controller.page() {
                    print_policy(policy);
                }
                let pager = controller.pager();
                println!(
                    "page {} of {} ({} {})",
                    pager.current_page(),
                    pager.page_count(),
                    pager.total_results(),
                    ScopePolicy::PLURAL
                );
                ActionOutcome::Done
            }
            PolicyCommand::Delete { id } => {
                let Some(policy) = controller.all().iter().find(|p| p.id == Some(id)).cloned()
                else {
                    self.ui.sink.error(&format!("Policy {id} not found"));
                    return ActionOutcome::Failed;
                };
                controller.delete(&policy).await
            }
        }
    }

    async fn users(&self, command: UserCommand) -> ActionOutcome {
        let id = match &command {
            UserCommand::Show { id }
            | UserCommand::GrantAdmin { id }
            | UserCommand::RevokeAdmin { id }
            | UserCommand::ResetMfa { id }
            | UserCommand::RequestAup { id } => id.clone(),
        };
        let mut controller = self.account_controller(&id);
        let outcome = controller.load_profile().await;
        if !outcome.is_done() {
            return outcome;
        }
        match command {
            UserCommand::Show { .. } => {
                if let Some(profile) = controller.profile() {
                    print_profile(profile);
                }
                ActionOutcome::Done
            }
            UserCommand::GrantAdmin { .. } => controller.set_authority(Authority::Admin, true).await,
            UserCommand::RevokeAdmin { .. } => {
                controller.set_authority(Authority::Admin, false).await
            }
            UserCommand::ResetMfa { .. } => {
                let name = controller
                    .profile()
                    .map(|profile| profile.user.display_name().to_owned())
                    .unwrap_or_else(|| id.clone());
                MfaController::new(Arc::new(self.http.clone()), self.ui.clone())
                    .reset_for(&id, &name)
                    .await
            }
            UserCommand::RequestAup { .. } => controller.request_aup_signature().await,
        }
    }

    async fn counts(&self) -> ActionOutcome {
        match self.app_state().refresh().await {
            Ok(counts) => {
                println!("users:    {}", counts.users);
                println!("groups:   {}", counts.groups);
                println!("policies: {}", counts.policies);
                ActionOutcome::Done
            }
            Err(err) => self.ui.report("Error retrieving counts", &err),
        }
    }
}

fn print_client(client: &RegisteredClient) {
    println!("client_id:    {}", client.client_id.as_deref().unwrap_or("-"));
    println!("name:         {}", client.display_name());
    println!("active:       {}", client.active);
    println!("scope:        {}", client.scope.as_deref().unwrap_or(""));
    println!("grant types:  {}", client.grant_types.join(", "));
    println!("redirect uris: {}", client.redirect_uris.join(", "));
    if let Some(method) = client.token_endpoint_auth_method.as_deref() {
        println!("auth method:  {method}");
    }
}

fn print_policy(policy: &ScopePolicy) {
    let subject = match (&policy.account, &policy.group) {
        (Some(account), _) => format!("account {}", account.name.as_deref().unwrap_or("?")),
        (None, Some(group)) => format!("group {}", group.name.as_deref().unwrap_or("?")),
        (None, None) => "everyone".into(),
    };
    println!(
        "{:>6} {:?} {:<10} {:?} [{}] {}",
        policy.label(),
        policy.rule,
        subject,
        policy.matching_policy,
        policy.scopes.join(", "),
        policy.description.as_deref().unwrap_or("")
    );
}

fn print_profile(profile: &crate::account::UserProfile) {
    let user = &profile.user;
    println!("id:              {}", user.id.as_deref().unwrap_or("-"));
    println!("name:            {}", user.display_name());
    println!("username:        {}", user.user_name.as_deref().unwrap_or("-"));
    println!("email:           {}", user.primary_email().unwrap_or("-"));
    println!("active:          {}", user.active);
    println!("service account: {}", user.is_service_account());
    println!("administrator:   {}", profile.is_admin());
    println!("monitoring:      {}", profile.is_reader());
    println!("mfa:             {}", profile.mfa_active);
    let groups: Vec<&str> = user
        .groups
        .iter()
        .map(|group| group.display.as_deref().unwrap_or(&group.value))
        .collect();
    println!("groups:          {}", groups.join(", "));
    match (&profile.aup_signature, profile.aup_expires_at) {
        (None, _) => println!("aup:             not signed"),
        (Some(signature), expires) => {
            let signed = signature
                .signature_time
                .as_ref()
                .map(format::timestamp)
                .unwrap_or_else(|| "-".into());
            let expires = expires
                .as_ref()
                .map(format::timestamp)
                .unwrap_or_else(|| "never".into());
            println!("aup:             signed {signed}, expires {expires}");
        }
    }
    for certificate in user.certificates() {
        println!(
            "certificate:     {} (issuer {})",
            certificate.subject_dn.as_deref().unwrap_or("-"),
            certificate.issuer_dn.as_deref().unwrap_or("-")
        );
    }
}
