//! # Madelyne - Runner Declarativo de Testes de Integração HTTP
//!
//! Ponto de entrada do binário. O usuário descreve a suíte em arquivos
//! de configuração (manifesto raiz + arquivos por grupo + payloads +
//! respostas esperadas + ambiente) e o runner executa cada teste contra
//! um endpoint HTTP vivo, comparando as respostas com um comparador
//! estrutural ciente de padrões.
//!
//! ## O que este arquivo faz?
//!
//! 1. **Processa a linha de comando** com `clap`
//! 2. **Inicializa o logging** (`tracing`, em stderr, nível controlado
//!    por `-v`/`-s` e `RUST_LOG`)
//! 3. **Carrega e valida** o manifesto
//! 4. **Executa a suíte** e imprime o progresso
//! 5. **Sai** com o código correto
//!
//! ## Códigos de saída:
//!
//! | Código | Significado              |
//! |--------|--------------------------|
//! | 0      | Sucesso                  |
//! | 1      | Argumento ausente        |
//! | 2      | Config não carregou      |
//! | 3      | Algum teste falhou       |

mod comparator;
mod matcher;
mod tester;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use tester::Tester;

#[derive(Parser)]
#[command(name = "madelyne")]
#[command(about = "Declarative black-box integration-test runner for HTTP APIs", long_about = None)]
struct Cli {
    /// Caminho para o manifesto raiz (YAML).
    config: Option<PathBuf>,

    /// Logs detalhados de debug (requisições, substituições, comandos).
    #[arg(long, short = 'v', default_value = "false")]
    verbose: bool,

    /// Só erros críticos no stderr.
    #[arg(long, short = 's', default_value = "false")]
    silent: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.silent {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    // stdout carrega o contrato do runner (progresso e veredito); os
    // logs vão para stderr.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .try_init();

    let Some(config_path) = cli.config else {
        eprintln!("You must provide a valid config file");
        process::exit(1);
    };

    let suite = match Tester::load(&config_path) {
        Ok(suite) => suite,
        Err(err) => {
            println!("Cannot read config file : {:#}", err);
            process::exit(2);
        }
    };

    println!("Testing REST API with Madelyne");
    if let Err(err) = suite.run().await {
        println!("\n\nError while running test: {:?}", err);
        process::exit(3);
    }
    println!("Success");
}
