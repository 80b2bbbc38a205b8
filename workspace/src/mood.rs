use std::path::{ Path, PathBuf };
use anyhow::Context;
use clap::{ Parser, Subcommand, ValueEnum };
use ndarray as nd;
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use mood_sim::{
    mkdir,
    write_npz,
    BlendMode,
    InitialWeights,
    SimParams,
    SimulationResult,
    Trigger,
    simulate,
};

/// Simulate the three-level mood model under triggers and dissipation.
#[derive(Parser)]
#[command(name = "mood")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run {
        #[command(flatten)]
        params: ParamArgs,

        /// Output archive
        #[arg(short, long, default_value = "output/mood.npz")]
        out: PathBuf,

        /// Also print the population curves to stdout as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Run independent simulations over a range of one parameter
    Sweep {
        #[command(flatten)]
        params: ParamArgs,

        /// Parameter to vary
        #[arg(long, value_enum)]
        param: SweepParam,

        /// First value
        #[arg(long)]
        from: f64,

        /// Last value
        #[arg(long)]
        to: f64,

        /// Number of values, including both ends
        #[arg(long, default_value = "11")]
        num: usize,

        /// Output archive
        #[arg(short, long, default_value = "output/mood_sweep.npz")]
        out: PathBuf,
    },

    /// Print the parameters a run would use, as TOML
    Params {
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SweepParam {
    G0,
    InitialState,
}

/// Run file plus per-field overrides.
#[derive(clap::Args)]
struct ParamArgs {
    /// TOML run file; defaults are used for anything it leaves out
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Neutral/excited energy splitting
    #[arg(long)]
    g0: Option<f64>,

    /// Euphoric -> neutral decay rate
    #[arg(long)]
    gamma_ug: Option<f64>,

    /// Depressive -> neutral decay rate
    #[arg(long)]
    gamma_dg: Option<f64>,

    /// Neutral -> euphoric/depressive excitation rate
    #[arg(long)]
    gamma_gg: Option<f64>,

    /// Simulation horizon, in days
    #[arg(long)]
    t_max: Option<f64>,

    /// Number of output times
    #[arg(long)]
    t_points: Option<usize>,

    /// Initial blend coefficient in [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    initial_state: Option<f64>,

    /// How blend weights become amplitudes
    #[arg(long, value_enum)]
    blend: Option<BlendArg>,

    /// Damping factor for later triggers
    #[arg(long)]
    resilience: Option<f64>,

    /// A trigger as TIME:INTENSITY; repeat for more, replacing any from the
    /// run file
    #[arg(long = "trigger", value_parser = parse_trigger)]
    triggers: Vec<Trigger>,

    /// Place this many evenly spaced triggers instead
    #[arg(long, conflicts_with = "triggers")]
    num_triggers: Option<usize>,

    /// Intensity of evenly spaced triggers
    #[arg(long, default_value = "1.0")]
    intensity: f64,

    /// Wall-clock budget for the integrator, in seconds
    #[arg(long)]
    max_wall_time: Option<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum BlendArg {
    Probability,
    Amplitude,
}

impl From<BlendArg> for BlendMode {
    fn from(arg: BlendArg) -> Self {
        match arg {
            BlendArg::Probability => Self::Probability,
            BlendArg::Amplitude => Self::Amplitude,
        }
    }
}

fn parse_trigger(s: &str) -> Result<Trigger, String> {
    let (time, intensity)
        = s.split_once(':')
        .ok_or_else(|| format!("expected TIME:INTENSITY, got '{s}'"))?;
    let time: f64
        = time.trim().parse()
        .map_err(|e| format!("bad trigger time '{time}': {e}"))?;
    let intensity: f64
        = intensity.trim().parse()
        .map_err(|e| format!("bad trigger intensity '{intensity}': {e}"))?;
    Ok(Trigger::new(time, intensity))
}

impl ParamArgs {
    fn resolve(&self) -> anyhow::Result<SimParams> {
        let mut params
            = match &self.config {
                Some(path) => SimParams::load(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => SimParams::default(),
            };
        if let Some(g0) = self.g0 { params.g0 = g0; }
        if let Some(gamma_ug) = self.gamma_ug { params.gamma_ug = gamma_ug; }
        if let Some(gamma_dg) = self.gamma_dg { params.gamma_dg = gamma_dg; }
        if let Some(gamma_gg) = self.gamma_gg { params.gamma_gg = gamma_gg; }
        if let Some(t_max) = self.t_max { params.t_max = t_max; }
        if let Some(t_points) = self.t_points { params.t_points = t_points; }
        if let Some(v) = self.initial_state { params.initial_state = v; }
        if let Some(blend) = self.blend { params.blend = blend.into(); }
        if let Some(r) = self.resilience { params.resilience = r; }
        // defaults are placed only now that t_max is final
        params.triggers
            = if !self.triggers.is_empty() {
                Some(self.triggers.clone())
            } else if let Some(n) = self.num_triggers {
                Some(Trigger::evenly_spaced(n, params.t_max, self.intensity))
            } else {
                Some(params.resolved_triggers())
            };
        if let Some(secs) = self.max_wall_time {
            params.solver.max_wall_time_secs = Some(secs);
        }
        params.validate()?;
        Ok(params)
    }
}

fn write_run(path: &Path, res: &SimulationResult) -> anyhow::Result<()> {
    let time = nd::Array1::from_vec(res.times.clone());
    let p_neutral = nd::Array1::from_vec(res.p_neutral.clone());
    let p_euphoric = nd::Array1::from_vec(res.p_euphoric.clone());
    let p_depressive = nd::Array1::from_vec(res.p_depressive.clone());
    let trigger_time: nd::Array1<f64>
        = res.triggers.iter().map(|tr| tr.time).collect();
    let trigger_intensity: nd::Array1<f64>
        = res.triggers.iter().map(|tr| tr.intensity).collect();
    write_npz!(
        path,
        arrays: {
            "time" => &time,
            "p_neutral" => &p_neutral,
            "p_euphoric" => &p_euphoric,
            "p_depressive" => &p_depressive,
            "trigger_time" => &trigger_time,
            "trigger_intensity" => &trigger_intensity,
        }
    )
    .with_context(|| format!("writing {}", path.display()))
}

fn print_csv(res: &SimulationResult) {
    println!("time,p_neutral,p_euphoric,p_depressive");
    for row in res.to_array().rows() {
        println!("{:.6},{:.8},{:.8},{:.8}", row[0], row[1], row[2], row[3]);
    }
}

fn make_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        mkdir!(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    Ok(())
}

fn run(params: SimParams, out: &Path, csv: bool) -> anyhow::Result<()> {
    let weights = InitialWeights::from_blend(params.initial_state);
    info!(%weights, "initial coefficients");
    if !csv { println!("initial coefficients: {}", weights); }

    let res = simulate(&params)?;
    make_parent(out)?;
    write_run(out, &res)?;
    if csv {
        print_csv(&res);
    } else if let Some([g, u, d]) = res.final_populations() {
        println!(
            "t = {:.2}: neutral = {:.4}, euphoric = {:.4}, depressive = {:.4}",
            params.t_max, g, u, d,
        );
        println!(
            "{} steps accepted, {} rejected; wrote {}",
            res.stats.accepted, res.stats.rejected, out.display(),
        );
    }
    Ok(())
}

fn sweep(
    params: SimParams,
    param: SweepParam,
    from: f64,
    to: f64,
    num: usize,
    out: &Path,
) -> anyhow::Result<()>
{
    anyhow::ensure!(num >= 1, "--num must be at least 1");
    let values: Vec<f64> = nd::Array1::linspace(from, to, num).to_vec();
    info!(?param, from, to, num, "starting sweep");
    let finals: Vec<[f64; 3]>
        = values.par_iter()
        .map(|&x| {
            let mut p = params.clone();
            match param {
                SweepParam::G0 => { p.g0 = x; },
                SweepParam::InitialState => { p.initial_state = x; },
            }
            let res = simulate(&p)
                .with_context(|| format!("{:?} = {}", param, x))?;
            res.final_populations()
                .ok_or_else(|| anyhow::anyhow!("empty result for {:?} = {}", param, x))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let value = nd::Array1::from_vec(values);
    let p_final: nd::Array2<f64>
        = nd::Array2::from_shape_fn((finals.len(), 3), |(k, j)| finals[k][j]);
    make_parent(out)?;
    write_npz!(
        out,
        arrays: {
            "value" => &value,
            "p_final" => &p_final,
        }
    )
    .with_context(|| format!("writing {}", out.display()))?;
    for (x, [g, u, d]) in value.iter().zip(finals.iter()) {
        println!("{:>10.4}  {:.4}  {:.4}  {:.4}", x, g, u, d);
    }
    println!("wrote {}", out.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { params, out, csv } => {
            run(params.resolve()?, &out, csv)
        },
        Commands::Sweep { params, param, from, to, num, out } => {
            sweep(params.resolve()?, param, from, to, num, &out)
        },
        Commands::Params { params } => {
            print!("{}", params.resolve()?.to_toml_string());
            Ok(())
        },
    }
}
