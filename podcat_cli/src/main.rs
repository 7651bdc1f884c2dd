#[macro_use] extern crate clap;
#[macro_use] extern crate log;

use podcat::*;
use clap::{Arg, App, AppSettings, SubCommand, ArgMatches};
use std::path::Path;
use std::process;

fn print_error_debug(e: &Error) {
    use std::env;
    // print causes of error if present
    if let Ok(_) = env::var("CIRCLECI") {
        // only print debug implementation rather than unwinding
        warn!("{:?}", e);
    } else {
        // normal case - unwind the error chain
        for e in e.iter().skip(1) {
            warn!("caused by: {}", e);
        }
    }
}

fn file_arg() -> Arg<'static, 'static> {
    Arg::with_name("file")
        .short("f")
        .long("file")
        .takes_value(true)
        .required(true)
        .help("Workload request file (yaml, or json with a .json extension)")
}

fn id_arg() -> Arg<'static, 'static> {
    Arg::with_name("id")
        .required(true)
        .help("Workload id")
}

fn main() {
    let app = App::new("podcat")
        .version(crate_version!())
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::ColoredHelp)
        .setting(AppSettings::DeriveDisplayOrder)
        .global_settings(&[AppSettings::ColoredHelp])
        .about("Keep workloads in sync between a record store and kubernetes")
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .global(true)
            .help("Increase verbosity"))
        .arg(Arg::with_name("debug")
            .short("d")
            .long("debug")
            .global(true)
            .help("Adds line numbers to log statements"))

        .subcommand(SubCommand::with_name("init")
            .about("Create the record store tables"))

        .subcommand(SubCommand::with_name("add")
            .arg(file_arg())
            .about("Create a workload in kubernetes and record it"))

        .subcommand(SubCommand::with_name("update")
            .arg(file_arg())
            .about("Update an existing workload (request needs an id)"))

        .subcommand(SubCommand::with_name("delete")
            .arg(id_arg())
            .about("Delete a workload from kubernetes and the record store"))

        .subcommand(SubCommand::with_name("get")
            .arg(id_arg())
            .about("Show a recorded workload"))

        .subcommand(SubCommand::with_name("list")
            .about("Show all recorded workloads"))

        .subcommand(SubCommand::with_name("translate")
            .arg(file_arg())
            .about("Show the deployment a request translates to"))

        .subcommand(SubCommand::with_name("config")
            .about("Show the resolved config"));

    // arg parse
    let args = app.get_matches();
    let name = args.subcommand_name().unwrap_or("podcat");
    let _ = run(&args).map_err(|e| {
        error!("{} error: {}", name, e);
        print_error_debug(&e);
        process::exit(1);
    });
    process::exit(0);
}

fn run(args: &ArgMatches) -> Result<()> {
    // initialise deps and set log default - always show INFO messages (+1)
    loggerv::Logger::new()
        .verbosity(args.occurrences_of("verbose") + 1)
        .module_path(true)
        .line_numbers(args.is_present("debug"))
        .init()
        .chain_err(|| "failed to initialise logger")?;

    // Ignore SIGPIPE errors to avoid having to use let _ = write! everywhere
    // See https://github.com/rust-lang/rust/issues/46016
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let mut rt = tokio::runtime::Runtime::new()?;
    rt.block_on(dispatch_commands(args))
}

fn id_of(args: &ArgMatches) -> Result<WorkloadId> {
    let raw = args.value_of("id").unwrap_or_default();
    let id = raw.parse::<i64>().chain_err(|| format!("invalid workload id '{}'", raw))?;
    Ok(WorkloadId { id })
}

fn file_of<'a>(args: &'a ArgMatches) -> &'a Path {
    Path::new(args.value_of("file").unwrap_or_default())
}

async fn workload_handler(conf: &Config) -> Result<WorkloadHandler<KubeGateway, SqliteStore>> {
    let gateway = KubeGateway::new(conf).await?;
    let store = SqliteStore::open(conf).await?;
    Ok(WorkloadHandler::new(Reconciler::new(gateway, store)))
}

/// Dispatch clap arguments to podcat handlers
///
/// Mutations go through the handler and need a kube config.
/// Reads only need the record store.
async fn dispatch_commands(args: &ArgMatches<'_>) -> Result<()> {
    let conf = Config::read()?;

    if args.subcommand_matches("config").is_some() {
        return show::config(&conf);
    }
    else if let Some(a) = args.subcommand_matches("translate") {
        return show::translate(file_of(a), &conf);
    }
    else if args.subcommand_matches("init").is_some() {
        SqliteStore::open(&conf).await?;
        info!("Initialised record store {}", conf.database);
        return Ok(());
    }

    // reads
    if let Some(a) = args.subcommand_matches("get") {
        let id = id_of(a)?;
        let store = SqliteStore::open(&conf).await?;
        return show::print_yaml(&handler::workload_info(&store, id).await?);
    }
    else if args.subcommand_matches("list").is_some() {
        let store = SqliteStore::open(&conf).await?;
        return show::print_yaml(&handler::all_workload(&store).await?);
    }

    // mutations
    if let Some(a) = args.subcommand_matches("add") {
        let req = show::read_request(file_of(a), &conf)?;
        let res = workload_handler(&conf).await?.add_workload(req).await?;
        return show::print_yaml(&res);
    }
    else if let Some(a) = args.subcommand_matches("update") {
        let req = show::read_request(file_of(a), &conf)?;
        let res = workload_handler(&conf).await?.update_workload(req).await?;
        return show::print_yaml(&res);
    }
    else if let Some(a) = args.subcommand_matches("delete") {
        let id = id_of(a)?;
        let res = workload_handler(&conf).await?.delete_workload(id).await?;
        return show::print_yaml(&res);
    }

    unreachable!("Subcommand valid, but not implemented")
}
