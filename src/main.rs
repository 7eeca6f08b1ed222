// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use kube::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use cf_tenancy::authorization::{AuthInfo, RoleBindingNamespacePermissions, TokenReviewIdentityProvider};
use cf_tenancy::config::Config;
use cf_tenancy::kubernetes::{ClusterNamespaceRetriever, TokenClientFactory};
use cf_tenancy::provisioning::{Provisioner, ProvisioningConfig};
use cf_tenancy::repositories::{
    CreateOrgMessage, CreateServiceBindingMessage, CreateSpaceMessage, DeleteSpaceMessage,
    ListOrgsMessage, ListServiceBindingsMessage, ListSpacesMessage, OrgRepository,
    RepositoryContext, ServiceAccountNames, ServiceBindingRepository, SpaceRepository,
};

const USAGE: &str = "usage: cf-tenancy <command> [args]

commands:
  create-org <name> [--suspended]
  list-orgs [--name N]... [--guid G]...
  get-org <guid>
  delete-org <guid>
  create-space <org-guid> <name> <registry-secret>
  list-spaces [--name N]... [--guid G]... [--org G]...
  get-space <guid>
  delete-space <org-guid> <guid>
  create-binding <space-guid> <app-guid> <instance-guid> [--name N]
  list-bindings [--app G]... [--instance G]...
  delete-binding <guid>";

struct Repositories {
    orgs: Arc<OrgRepository>,
    spaces: SpaceRepository,
    bindings: ServiceBindingRepository,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("{}", USAGE);
    };

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: root_namespace={}, org_backend={:?}",
        config.root_namespace, config.org_backend
    );

    let token = std::env::var("CF_TENANCY_TOKEN").context("CF_TENANCY_TOKEN environment variable not set")?;
    let auth = AuthInfo::from_token(token);

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let repos = build_repositories(client, &config).await?;
    run(&repos, &auth, command, rest).await
}

async fn build_repositories(client: Client, config: &Config) -> Result<Repositories> {
    let user_clients = Arc::new(TokenClientFactory::infer().await?);
    let identities = Arc::new(TokenReviewIdentityProvider::new(client.clone()));
    let permissions = Arc::new(RoleBindingNamespacePermissions::new(
        client.clone(),
        identities,
        config.root_namespace.clone(),
    ));

    let ctx = RepositoryContext {
        root_namespace: config.root_namespace.clone(),
        privileged: client.clone(),
        user_clients: user_clients.clone(),
        permissions: permissions.clone(),
    };
    let provisioner = Arc::new(Provisioner::new(
        client.clone(),
        user_clients,
        permissions,
        ProvisioningConfig {
            timeout: config.provisioning_timeout,
            poll_interval: config.permission_poll_interval,
        },
    ));

    let orgs = Arc::new(OrgRepository::new(ctx.clone(), provisioner.clone(), config.org_backend));
    let spaces = SpaceRepository::new(
        ctx.clone(),
        provisioner,
        orgs.clone(),
        ServiceAccountNames {
            builder: config.builder_service_account.clone(),
            runner: config.runner_service_account.clone(),
        },
    );
    let bindings = ServiceBindingRepository::new(ctx, Arc::new(ClusterNamespaceRetriever::new(client)));

    Ok(Repositories { orgs, spaces, bindings })
}

async fn run(repos: &Repositories, auth: &AuthInfo, command: &str, args: &[String]) -> Result<()> {
    match command {
        "create-org" => {
            let [name, ..] = args else { bail!(USAGE) };
            let message = CreateOrgMessage {
                name: name.clone(),
                suspended: args.iter().any(|a| a == "--suspended"),
                ..Default::default()
            };
            print(&repos.orgs.create_org(auth, message).await?)
        }
        "list-orgs" => {
            let filter = ListOrgsMessage {
                names: flag_values(args, "--name"),
                guids: flag_values(args, "--guid"),
            };
            print(&repos.orgs.list_orgs(auth, filter).await?)
        }
        "get-org" => {
            let [guid] = args else { bail!(USAGE) };
            print(&repos.orgs.get_org(auth, guid).await?)
        }
        "delete-org" => {
            let [guid] = args else { bail!(USAGE) };
            repos.orgs.delete_org(auth, guid).await?;
            info!("Org {} deleted", guid);
            Ok(())
        }
        "create-space" => {
            let [org, name, secret] = args else { bail!(USAGE) };
            let message = CreateSpaceMessage {
                name: name.clone(),
                organization_guid: org.clone(),
                image_registry_credentials: secret.clone(),
                ..Default::default()
            };
            print(&repos.spaces.create_space(auth, message).await?)
        }
        "list-spaces" => {
            let filter = ListSpacesMessage {
                names: flag_values(args, "--name"),
                guids: flag_values(args, "--guid"),
                organization_guids: flag_values(args, "--org"),
            };
            print(&repos.spaces.list_spaces(auth, filter).await?)
        }
        "get-space" => {
            let [guid] = args else { bail!(USAGE) };
            print(&repos.spaces.get_space(auth, guid).await?)
        }
        "delete-space" => {
            let [org, guid] = args else { bail!(USAGE) };
            let message = DeleteSpaceMessage {
                guid: guid.clone(),
                organization_guid: org.clone(),
            };
            repos.spaces.delete_space(auth, message).await?;
            info!("Space {} deleted", guid);
            Ok(())
        }
        "create-binding" => {
            let [space, app, instance, ..] = args else { bail!(USAGE) };
            if repos
                .bindings
                .service_binding_exists(auth, space, app, instance)
                .await?
            {
                bail!("app {} is already bound to service instance {}", app, instance);
            }
            let message = CreateServiceBindingMessage {
                name: flag_values(args, "--name").into_iter().next(),
                app_guid: app.clone(),
                service_instance_guid: instance.clone(),
                space_guid: space.clone(),
            };
            print(&repos.bindings.create_service_binding(auth, message).await?)
        }
        "list-bindings" => {
            let filter = ListServiceBindingsMessage {
                app_guids: flag_values(args, "--app"),
                service_instance_guids: flag_values(args, "--instance"),
            };
            print(&repos.bindings.list_service_bindings(auth, filter).await?)
        }
        "delete-binding" => {
            let [guid] = args else { bail!(USAGE) };
            repos.bindings.delete_service_binding(auth, guid).await?;
            info!("Service binding {} deleted", guid);
            Ok(())
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

/// Values following every occurrence of `flag`
fn flag_values(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
        .collect()
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}
