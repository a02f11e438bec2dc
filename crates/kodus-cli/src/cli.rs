use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kodus")]
#[command(version, about = "Agent execution core: kernel, manager, agent and review pipeline demos")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging.
    #[arg(long, global = true, env = "KODUS_VERBOSE")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive the execution kernel through init / emit / process / pause.
    Kernel,
    /// Run an agent invocation with a scripted LLM response.
    Agent {
        /// Input handed to the agent as its first user message.
        #[arg(long, default_value = "what is 6*7?")]
        prompt: String,
        /// Scripted final answer the mock LLM adapter returns.
        #[arg(long, default_value = "42")]
        answer: String,
    },
    /// Run the staged code-review pipeline against a synthetic pull request.
    Review,
}
