use core::fmt::Display;
use core::time::Duration;
use std::time::Instant;

/// How a benchmark measured its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMethod {
    /// Wall clock time around execution plus a full synchronization.
    System,
}

/// Results of a benchmark run.
#[derive(new, Debug, Clone)]
pub struct BenchmarkDurations {
    /// How these durations were measured.
    pub timing_method: TimingMethod,
    /// All durations of the run, in the order they were benchmarked.
    pub durations: Vec<Duration>,
}

impl BenchmarkDurations {
    /// Returns a tuple of durations: (min, max, median)
    fn min_max_median_durations(&self) -> (Duration, Duration, Duration) {
        let mut sorted = self.durations.clone();
        sorted.sort();
        let min = *sorted.first().unwrap_or(&Duration::ZERO);
        let max = *sorted.last().unwrap_or(&Duration::ZERO);
        let median = sorted.get(sorted.len() / 2).copied().unwrap_or_default();
        (min, max, median)
    }

    /// Returns the median duration among all durations
    pub(crate) fn mean_duration(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        self.durations.iter().sum::<Duration>() / self.durations.len() as u32
    }

    /// Returns the variance durations for the durations
    pub(crate) fn variance_duration(&self, mean: Duration) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let var = self
            .durations
            .iter()
            .map(|duration| {
                let tmp = duration.as_secs_f64() - mean.as_secs_f64();
                Duration::from_secs_f64(tmp * tmp)
            })
            .sum::<Duration>()
            / self.durations.len() as u32;
        var
    }
}

impl Display for BenchmarkDurations {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let computed = BenchmarkComputations::new(self);
        let BenchmarkComputations {
            mean,
            median,
            variance,
            min,
            max,
        } = computed;
        let num_sample = self.durations.len();

        f.write_str(
            format!(
                "
―――――――― Result ―――――――――
  Timing      {:?}
  Samples     {num_sample}
  Mean        {mean:.3?}
  Variance    {variance:.3?}
  Median      {median:.3?}
  Min         {min:.3?}
  Max         {max:.3?}
―――――――――――――――――――――――――",
                self.timing_method
            )
            .as_str(),
        )
    }
}

/// Computed values from benchmark durations.
#[derive(Debug, Default, Clone, Copy)]
pub struct BenchmarkComputations {
    /// Mean of all the durations.
    pub mean: Duration,
    /// Median of all the durations.
    pub median: Duration,
    /// Variance of all the durations.
    pub variance: Duration,
    /// Minimum duration amongst all durations.
    pub min: Duration,
    /// Maximum duration amongst all durations.
    pub max: Duration,
}

impl BenchmarkComputations {
    /// Compute duration values and return a BenchmarkComputations struct
    pub fn new(durations: &BenchmarkDurations) -> Self {
        let mean = durations.mean_duration();
        let (min, max, median) = durations.min_max_median_durations();
        Self {
            mean,
            median,
            min,
            max,
            variance: durations.variance_duration(mean),
        }
    }
}

/// Throughput figures derived from the median duration of a run.
#[derive(Debug, Clone, Copy)]
pub struct Throughput {
    /// Items processed per second.
    pub items_per_second: f64,
    /// Bytes moved (read + written) per second.
    pub bytes_per_second: f64,
}

impl Throughput {
    /// Computes the throughput of a run processing `items` elements and moving `bytes` bytes
    /// per sample.
    pub fn new(durations: &BenchmarkDurations, items: usize, bytes: usize) -> Self {
        let median = BenchmarkComputations::new(durations).median.as_secs_f64();
        if median == 0.0 {
            return Self {
                items_per_second: 0.0,
                bytes_per_second: 0.0,
            };
        }
        Self {
            items_per_second: items as f64 / median,
            bytes_per_second: bytes as f64 / median,
        }
    }
}

impl Display for Throughput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:.3} Gitems/s, {:.3} GB/s",
            self.items_per_second / 1e9,
            self.bytes_per_second / 1e9
        )
    }
}

/// Benchmark trait.
pub trait Benchmark {
    /// Benchmark arguments.
    type Args: Clone;

    /// Prepare the benchmark, run anything that is essential for the benchmark, but shouldn't
    /// count as included in the duration.
    ///
    /// # Notes
    ///
    /// This should not include warmup, the benchmark will be run at least one time without
    /// measuring the execution time.
    fn prepare(&self) -> Self::Args;

    /// Execute the benchmark and returns the time it took to complete.
    fn execute(&self, args: Self::Args);

    /// Number of samples per run required to have a statistical significance.
    fn num_samples(&self) -> usize {
        10
    }

    /// Name of the benchmark, should be short and it should match the name
    /// defined in the crate Cargo.toml
    fn name(&self) -> String;

    /// Wait for computation to complete.
    fn sync(&self);

    /// Run the benchmark a number of times.
    fn run(&self) -> BenchmarkDurations {
        let args = self.prepare();

        // Warmup
        self.execute(args.clone());
        self.sync();

        let mut durations = Vec::with_capacity(self.num_samples());

        for _ in 0..self.num_samples() {
            // Prevent any tasks to interfere with the benchmark.
            self.sync();
            let start = Instant::now();

            self.execute(args.clone());
            self.sync();

            durations.push(start.elapsed());
        }

        BenchmarkDurations::new(TimingMethod::System, durations)
    }
}

/// Result of a benchmark run, with metadata
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// Individual raw results of the run
    pub raw: BenchmarkDurations,
    /// Computed values for the run
    pub computed: BenchmarkComputations,
    /// Benchmark name
    pub name: String,
}

impl Display for BenchmarkResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Benchmark: {}{}", self.name, self.raw)
    }
}

/// Runs the given benchmark on the device and prints result and information.
pub fn run_benchmark<BM>(benchmark: BM) -> BenchmarkResult
where
    BM: Benchmark,
{
    let name = benchmark.name();
    let durations = benchmark.run();
    log::info!("Benchmark {name} done with {} samples", durations.durations.len());

    BenchmarkResult {
        computed: BenchmarkComputations::new(&durations),
        raw: durations,
        name,
    }
}
