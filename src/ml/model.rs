use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// Three 2x2 max-pools: inputs narrower than this collapse to zero.
pub const MIN_INPUT_SIZE: u32 = 8;

/// The training driver and the inferencer only talk to the
/// network through these two calls.
pub trait ImageClassifier<B: Backend> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Logits plus mean cross-entropy against `labels` ([batch]).
    fn predict_with_loss(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 2>, Tensor<B, 1>);
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ConvNetConfig {
    pub num_classes: usize,
    #[config(default = 32)]
    pub base_channels: usize,
    #[config(default = 0.25)]
    pub dropout: f64,
}

impl ConvNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        let c = self.base_channels;
        ConvNet {
            block1:      ConvBlock::new(3, c, device),
            block2:      ConvBlock::new(c, c * 2, device),
            block3:      ConvBlock::new(c * 2, c * 4, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout:     DropoutConfig::new(self.dropout).init(),
            head:        LinearConfig::new(c * 4, self.num_classes).init(device),
        }
    }
}

/// conv 3x3 (same padding) → relu → max-pool 2x2
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:       Conv2d<B>,
    pub pool:       MaxPool2d,
    pub activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    fn new(channels_in: usize, channels_out: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([channels_in, channels_out], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        Self { conv, pool, activation: Relu::new() }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.activation.forward(self.conv.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub block1:      ConvBlock<B>,
    pub block2:      ConvBlock<B>,
    pub block3:      ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
    pub dropout:     Dropout,
    pub head:        Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for ConvNet<B> {
    fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.block1.forward(images);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);
        let x = self.global_pool.forward(x);   // [batch, channels, 1, 1]
        let x = x.flatten::<2>(1, 3);         // [batch, channels]
        self.head.forward(self.dropout.forward(x))
    }

    fn predict_with_loss(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 2>, Tensor<B, 1>) {
        let logits = self.predict(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (logits, loss)
    }
}
