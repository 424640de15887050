//! txflow: run token transaction flows from the command line.
//!
//! # Usage
//! ```text
//! txflow --config txflow.toml run \
//!     --standard ERC20 --token 0x... --spender 0x... --amount 1000 \
//!     --contract 0x... --function "deposit(uint256)" --arg 1000
//! txflow allowance --standard ERC721 --token 0x... --spender 0x... --token-id 7
//! txflow balance --token 0x...
//! ```
//!
//! The signing key is read from the variable named by `wallet.private_key_env`.

use alloy::primitives::{Address, U256};
use alloy::sol_types::{SolCall, SolValue};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use evm_txflow::blockchain::abi::IERC20;
use evm_txflow::blockchain::{
    AlloyChainClient, ChainResult, LocalSession, ProviderContext, TargetCall, WalletSession,
};
use evm_txflow::config::{load_config, FlowConfig};
use evm_txflow::flow::{
    check_allowance, AllowanceQuery, ConfirmOptions, FlowError, FlowParams, TokenStandard,
    TransactionFlow,
};
use evm_txflow::observability::logging;

#[derive(Parser)]
#[command(name = "txflow")]
#[command(about = "Allowance check, approval, execution and confirmation for EVM token flows", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full flow and print the final state as JSON
    Run {
        #[command(flatten)]
        token: TokenArgs,

        /// Contract to call once spending is authorized
        #[arg(long)]
        contract: Address,

        /// Function signature, e.g. "deposit(uint256)"
        #[arg(long)]
        function: String,

        /// Function argument, repeated in order
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Confirmation depth (defaults to confirmation.default_depth)
        #[arg(long)]
        confirmations: Option<u64>,

        /// Approve even if the current allowance already suffices
        #[arg(long)]
        explicit_approval: bool,
    },
    /// Check whether the spender is already authorized
    Allowance {
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Show native balance, and a token balance with --token
    Balance {
        /// Account to query (defaults to the session account)
        #[arg(long)]
        account: Option<Address>,

        /// ERC20 token to query balanceOf on
        #[arg(long)]
        token: Option<Address>,
    },
}

#[derive(Args)]
struct TokenArgs {
    /// ERC20, ERC721, ERC1155 or NATIVE
    #[arg(long, default_value = "ERC20")]
    standard: TokenStandard,

    /// Token contract address (ignored for NATIVE)
    #[arg(long, default_value_t = Address::ZERO)]
    token: Address,

    #[arg(long)]
    spender: Option<Address>,

    #[arg(long)]
    token_id: Option<U256>,

    /// Amount in base units; value sent with the call for NATIVE
    #[arg(long)]
    amount: Option<U256>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FlowConfig::default(),
    };
    logging::init(&config.observability);

    tracing::info!(
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        "Configuration loaded"
    );

    let context = ProviderContext::new(config);
    let session = context.connect()?;

    match cli.command {
        Commands::Run {
            token,
            contract,
            function,
            args,
            confirmations,
            explicit_approval,
        } => {
            let target = TargetCall::from_signature_str(contract, &function, &args)?;
            check_chain(&context).await?;
            let depth = confirmations.unwrap_or(context.config().confirmation.default_depth);
            let params = token
                .into_params(target)
                .with_confirmations(depth)
                .with_explicit_approval(explicit_approval);
            run(&context, session, params).await?;
        }
        Commands::Allowance { token } => {
            let spender = token.spender.ok_or_else(|| {
                FlowError::Parameter("--spender is required".to_string())
            })?;
            let query = AllowanceQuery {
                standard: token.standard,
                token: token.token,
                spender,
                owner: session.account(),
                token_id: token.token_id,
                amount: token.amount,
            };
            let reader = session.reader();
            let sufficient = check_allowance(&query, reader.as_deref()).await?;
            println!("{}", serde_json::json!({ "sufficient": sufficient }));
        }
        Commands::Balance { account, token } => {
            let account = account.or(session.account()).ok_or_else(|| {
                FlowError::MissingContext("No account: pass --account or set a key".to_string())
            })?;
            let reader = session
                .reader()
                .ok_or_else(|| FlowError::MissingContext("No public client".to_string()))?;

            let native = reader.get_balance(account).await?;
            let mut out = serde_json::json!({
                "account": account,
                "native": native.to_string(),
            });

            if let Some(token) = token {
                let call = IERC20::balanceOfCall { account };
                let data = reader.read_contract(token, call.abi_encode().into()).await?;
                let balance = U256::abi_decode(&data)?;
                out["token"] = serde_json::json!({
                    "address": token,
                    "balance": balance.to_string(),
                });
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

async fn run(
    context: &ProviderContext,
    session: LocalSession,
    params: FlowParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ConfirmOptions::from(&context.config().confirmation);
    let flow = TransactionFlow::new(Arc::new(session), params).with_confirm_options(options);

    if !flow.is_session_ready() {
        tracing::warn!(
            env = %context.config().wallet.private_key_env,
            "No signing key configured, the flow will fail its precondition"
        );
    }

    let mut updates = flow.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            eprintln!("step: {}", state.step);
            if state.step.is_terminal() {
                break;
            }
        }
    });

    let result = flow.run().await;
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Step printer task failed");
    }

    println!("{}", serde_json::to_string_pretty(&flow.state())?);
    result?;
    Ok(())
}

/// Refuse to submit anything to a node on the wrong chain.
async fn check_chain(context: &ProviderContext) -> ChainResult<()> {
    let client = AlloyChainClient::new(context.config().chain.clone())?;
    if !client.is_healthy().await {
        tracing::warn!(rpc_url = %context.config().chain.rpc_url, "RPC endpoint not responding");
    }
    client.verify_chain_id().await
}

impl TokenArgs {
    fn into_params(self, target: TargetCall) -> FlowParams {
        let mut params = FlowParams::new(self.standard, self.token, target);
        params.spender = self.spender;
        params.token_id = self.token_id;
        params.amount = self.amount;
        params
    }
}
