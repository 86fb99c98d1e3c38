use super::super::args::*;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.cmd {
        Command::Resolve(args) => super::resolve::run(&global, args).await,
        Command::Set(args) => super::set::run(&global, args).await,
        Command::Reset(args) => super::reset::run(&global, args).await,
        Command::Show(args) => super::show::run(&global, args).await,
        Command::Purge(args) => super::purge::run(&global, args).await,
        Command::List => super::list::run(&global).await,
        Command::Detect(args) => super::detect::run(&global, args),
    }
}
